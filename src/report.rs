use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::data::background::{BackgroundModel, Correction};
use crate::data::model::{ChannelMap, Sample, SpectrumKind};

const NO_COMMENT: &str = "No deviations noted during analysis";
const NO_DATA: &str = "No data";

fn section_title(kind: SpectrumKind) -> &'static str {
    match kind {
        SpectrumKind::Abs => "Absorbance measurement",
        SpectrumKind::Ex350 => "Fluorescence measurement, 350 nm excitation",
        SpectrumKind::Ex400 => "Fluorescence measurement, 400 nm excitation",
    }
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else {
        v.to_string()
    }
}

fn describe(correction: Option<Correction>) -> String {
    match correction {
        None => "not subtracted".to_string(),
        Some(Correction::BlankMean) => "blank mean subtracted".to_string(),
        Some(Correction::ExactGain(g)) => format!("baseline at gain {g} subtracted"),
        Some(Correction::Interpolated { under, over, .. }) => {
            format!("baseline interpolated between gains {under} and {over} subtracted")
        }
        Some(Correction::Uncorrected { gain }) => {
            format!("not subtracted, gain {gain} outside calibrated baselines")
        }
    }
}

/// File name for a sample label; path separators and other awkward
/// characters become `_`.
pub fn report_file_name(label: &str) -> String {
    let stem: String = label
        .chars()
        .map(|c| if c.is_alphanumeric() || "-_. ".contains(c) { c } else { '_' })
        .collect();
    format!("{}.csv", stem.trim())
}

fn record<I, S>(writer: &mut csv::Writer<std::fs::File>, fields: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    writer.write_record(fields).context("writing report row")
}

/// Write one sample's report to `dir`, returning its path.
///
/// With `subtract` set, every spectrum whose kind the background supports
/// is written background-corrected; the rest are written as measured.
pub fn write_sample_report(
    sample: &Sample,
    background: &BackgroundModel,
    subtract: bool,
    dir: &Path,
) -> Result<PathBuf> {
    let path = dir.join(report_file_name(&sample.label));
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(&path)
        .with_context(|| format!("creating report {}", path.display()))?;

    record(&mut writer, ["Class:", sample.class.as_str()])?;
    record(&mut writer, ["Sample:", sample.label.as_str()])?;
    if !sample.reactants.is_empty() {
        let mut row = vec!["Reactants:".to_string()];
        row.extend(sample.reactants.iter().cloned());
        record(&mut writer, row)?;
    }
    record(&mut writer, [sample.comment.as_deref().unwrap_or(NO_COMMENT)])?;

    for kind in SpectrumKind::ALL {
        record(&mut writer, [""])?;
        record(&mut writer, [section_title(kind)])?;

        let Some(spectrum) = sample.spectrum(kind) else {
            record(&mut writer, [NO_DATA])?;
            continue;
        };

        let (channels, correction): (ChannelMap, Option<Correction>) =
            if subtract && background.supports(spectrum.kind()?) {
                let corrected = background
                    .subtract(spectrum)
                    .with_context(|| format!("correcting {kind} spectrum of sample {}", sample.label))?;
                (corrected.channels, Some(corrected.correction))
            } else {
                if subtract {
                    warn!("no {kind} background available, sample {} reported uncorrected", sample.label);
                }
                (spectrum.channels.clone(), None)
            };

        if let Some(gain) = spectrum.gain() {
            record(&mut writer, ["Gain:".to_string(), gain.to_string()])?;
        }
        record(&mut writer, ["Background:".to_string(), describe(correction)])?;

        let mut row = vec!["Wavelength [nm]".to_string()];
        row.extend(spectrum.wavelengths.iter().copied().map(format_value));
        record(&mut writer, row)?;

        for (channel, values) in &channels {
            let mut row = vec![channel.display_name().to_string()];
            row.extend(values.iter().copied().map(format_value));
            record(&mut writer, row)?;
        }
    }

    writer.flush().context("flushing report")?;
    Ok(path)
}

/// Write the JSON overview of all reported samples.
pub fn write_summary<'a, I>(samples: I, path: &Path) -> Result<()>
where
    I: IntoIterator<Item = &'a Sample>,
{
    let samples: Vec<&Sample> = samples.into_iter().collect();
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating summary {}", path.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &samples)
        .context("writing summary")?;
    info!("summary of {} samples written to {}", samples.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Channel, Mode, Spectrum};
    use chrono::NaiveDateTime;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rusty-cqd-report-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_with_abs() -> Sample {
        let t = NaiveDateTime::parse_from_str("2024-10-07 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let mut s = Sample::new("P1/01", 1, 1, "7B", None, vec!["urea".into()]);
        s.spectra.insert(
            SpectrumKind::Abs,
            Spectrum {
                wavelengths: vec![300.0, 310.0],
                channels: ChannelMap::from([(Channel::Abs, vec![0.5, f64::NAN])]),
                mode: Mode::Absorbance,
                start: t,
                end: t,
            },
        );
        s
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(report_file_name("P1/01"), "P1_01.csv");
        assert_eq!(report_file_name("Prov 7"), "Prov 7.csv");
    }

    #[test]
    fn test_raw_report_contents() {
        let dir = scratch_dir("raw");
        let path = write_sample_report(&sample_with_abs(), &BackgroundModel::new(), false, &dir).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();

        assert!(text.starts_with("Class:,7B\nSample:,P1/01\nReactants:,urea\n"));
        assert!(text.contains(NO_COMMENT));
        assert!(text.contains("Wavelength [nm],300,310\n"));
        assert!(text.contains("Absorbance,0.5,NaN\n"));
        assert!(text.contains("Background:,not subtracted\n"));
        assert_eq!(text.matches(NO_DATA).count(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_subtracted_report_uses_blank_mean() {
        let dir = scratch_dir("subtracted");
        let mut blank = sample_with_abs();
        blank
            .spectra
            .get_mut(&SpectrumKind::Abs)
            .unwrap()
            .channels
            .insert(Channel::Abs, vec![0.25, 0.25]);
        let mut background = BackgroundModel::new();
        background.init_absorbance([&blank]).unwrap();

        let path = write_sample_report(&sample_with_abs(), &background, true, &dir).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Absorbance,0.25,NaN\n"));
        assert!(text.contains("Background:,blank mean subtracted\n"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_summary_lists_kinds() {
        let dir = scratch_dir("summary");
        let path = dir.join("summary.json");
        let sample = sample_with_abs();
        write_summary([&sample], &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["label"], "P1/01");
        assert_eq!(value[0]["spectra"], serde_json::json!(["abs"]));

        std::fs::remove_dir_all(&dir).ok();
    }
}
