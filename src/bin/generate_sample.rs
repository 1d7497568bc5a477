//! Writes a synthetic run directory (plate map, one measurement sheet per
//! plate, fluorescence baselines and a config) that `rusty-cqd` can process.
//!
//! Usage: `generate_sample [output-dir]` (default `sample_run`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime};

const PLATES: u32 = 2;
const SAMPLES_PER_ROW: u32 = 4;
const BASELINE_GAINS: [u32; 3] = [60, 80, 100];
const SAMPLE_GAINS: [u32; 5] = [60, 70, 80, 100, 120];
const CLASSES: [&str; 3] = ["7a", "7b", "8c"];
const REACTANTS: [&str; 4] = ["citric acid", "urea", "glucose", "ethylenediamine"];
const BLANK_COMMENT: &str = "reference sample with only water";
const OVERFLOW_LEVEL: f64 = 20_000.0;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn generate_spectrum(
    wavelengths: &[f64],
    peaks: &[(f64, f64, f64)],
    offset: f64,
    noise_level: f64,
    rng: &mut SimpleRng,
) -> Vec<f64> {
    wavelengths
        .iter()
        .map(|&wl| {
            let signal: f64 = peaks
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(wl, mu, sigma, amp))
                .sum();
            offset + signal + rng.gauss(0.0, noise_level)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

// ---------------------------------------------------------------------------
// Sheet writing
// ---------------------------------------------------------------------------

struct SheetWriter {
    writer: csv::Writer<std::fs::File>,
    clock: NaiveDateTime,
}

impl SheetWriter {
    fn create(path: &Path, clock: NaiveDateTime) -> Result<Self> {
        let writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        Ok(SheetWriter { writer, clock })
    }

    fn row<S: AsRef<str>>(&mut self, cells: &[S]) -> Result<()> {
        let cells: Vec<&str> = cells.iter().map(|c| c.as_ref()).collect();
        // a record with no fields is written as one empty field
        let cells = if cells.is_empty() { vec![""] } else { cells };
        self.writer.write_record(&cells)?;
        Ok(())
    }

    fn attribute(&mut self, name: &str, value: &str) -> Result<()> {
        self.row(&[name, "", "", "", value])
    }

    fn data(&mut self, header: &str, values: &[f64]) -> Result<()> {
        let mut cells = vec![header.to_string()];
        cells.extend(values.iter().map(|v| {
            if *v > OVERFLOW_LEVEL {
                "OVER".to_string()
            } else {
                format!("{v:.4}")
            }
        }));
        self.row(&cells)
    }

    fn tick(&mut self) -> String {
        self.clock += Duration::minutes(2);
        self.clock.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// One label block: attributes, start time, data rows, end time.
    fn block(
        &mut self,
        label: &str,
        attributes: &[(&str, String)],
        wavelengths: &[f64],
        channels: &[Vec<f64>],
    ) -> Result<()> {
        self.row(&[format!("Label: {label}")])?;
        for (name, value) in attributes {
            self.attribute(name, value)?;
        }
        let start = self.tick();
        self.row(&["Start Time:", start.as_str()])?;
        self.row::<&str>(&[])?;
        self.data("Wavel.", wavelengths)?;
        for (i, values) in channels.iter().enumerate() {
            let well = ["A", "B", "C", "D"][i % 4];
            self.data(&format!("{well}{}", i + 1), values)?;
        }
        self.row::<&str>(&[])?;
        let end = self.tick();
        self.row(&["End Time:", end.as_str()])?;
        self.row::<&str>(&[])?;
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn absorbance_attributes() -> Vec<(&'static str, String)> {
    vec![
        ("Mode", "Absorbance".to_string()),
        ("Wavelength start", "300".to_string()),
        ("Wavelength end", "700".to_string()),
    ]
}

fn fluorescence_attributes(excitation: u32, gain: u32) -> Vec<(&'static str, String)> {
    vec![
        ("Mode", "Fluorescence Top Reading".to_string()),
        ("Excitation Wavelength", excitation.to_string()),
        ("Emission Wavelength Start", (excitation + 50).to_string()),
        ("Gain", gain.to_string()),
    ]
}

/// Baseline counts at `gain`: a flat dark level that scales with gain.
fn baseline_level(gain: u32) -> f64 {
    gain as f64 * 5.0
}

fn fluorescence_channels(
    wavelengths: &[f64],
    excitation: u32,
    gain: u32,
    brightness: f64,
    rng: &mut SimpleRng,
) -> Vec<Vec<f64>> {
    let emission = excitation as f64 + 100.0;
    // water, copper, iron, cadmium: metals quench the emission to varying degree
    [1.0, 0.6, 0.4, 0.8]
        .iter()
        .map(|quench| {
            let amp = brightness * quench * gain as f64;
            generate_spectrum(
                wavelengths,
                &[(emission, 30.0, amp)],
                baseline_level(gain),
                2.0,
                rng,
            )
        })
        .collect()
}

fn main() -> Result<()> {
    let out: PathBuf = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_run".to_string())
        .into();
    let measurements = out.join("measurements");
    std::fs::create_dir_all(&measurements).with_context(|| format!("creating {}", measurements.display()))?;

    let mut rng = SimpleRng::new(42);
    let t0 = NaiveDateTime::parse_from_str("2024-10-07 09:00:00", "%Y-%m-%d %H:%M:%S")?;

    let abs_wl: Vec<f64> = (0..41).map(|i| 300.0 + i as f64 * 10.0).collect();
    let ex350_wl: Vec<f64> = (0..61).map(|i| 400.0 + i as f64 * 5.0).collect();
    let ex400_wl: Vec<f64> = (0..61).map(|i| 450.0 + i as f64 * 5.0).collect();
    let water_abs: Vec<f64> = abs_wl.iter().map(|wl| 0.04 + 8.0 / wl).collect();

    // ---- plate map ----
    let mut map = SheetWriter::create(&out.join("plate_map.csv"), t0)?;
    let mut wells: Vec<(u32, u32, bool)> = Vec::new();
    for plate in 1..=PLATES {
        map.row(&["Plate".to_string(), plate.to_string()])?;
        for (row_letter, offset) in [("A", 0), ("E", 12)] {
            for col in 1..=SAMPLES_PER_ROW {
                let well = offset + col;
                let blank = col == 1 && row_letter == "A";
                let label = format!("P{plate}-{well:02}");
                let comment = if blank { BLANK_COMMENT } else { "" };
                let marker = if col == 1 { row_letter } else { "" };
                map.row(&[
                    marker.to_string(),
                    col.to_string(),
                    label,
                    rng.pick(&REACTANTS).to_string(),
                    if blank { String::new() } else { rng.pick(&REACTANTS).to_string() },
                    rng.pick(&CLASSES).to_string(),
                    comment.to_string(),
                ])?;
                wells.push((plate, well, blank));
            }
        }
    }
    map.finish()?;

    // ---- measurement sheets ----
    let mut blocks = 0;
    for plate in 1..=PLATES {
        let path = measurements.join(format!("Sheet{plate}.csv"));
        let mut sheet = SheetWriter::create(&path, t0 + Duration::hours(plate as i64))?;
        sheet.row(&["Application: Tecan i-control"])?;
        sheet.row::<&str>(&[])?;

        for &(_, well, blank) in wells.iter().filter(|(p, _, _)| *p == plate) {
            let brightness = if blank { 0.0 } else { 20.0 + rng.next_f64() * 200.0 };

            let abs: Vec<f64> = if blank {
                generate_spectrum(&abs_wl, &[], 0.0, 0.002, &mut rng)
                    .iter()
                    .zip(&water_abs)
                    .map(|(noise, w)| w + noise)
                    .collect()
            } else {
                let peak = brightness / 200.0;
                generate_spectrum(&abs_wl, &[(350.0, 40.0, peak)], 0.05, 0.005, &mut rng)
            };
            sheet.block(&well.to_string(), &absorbance_attributes(), &abs_wl, &[abs])?;

            for (suffix, excitation, wl) in [("a", 350, &ex350_wl), ("b", 400, &ex400_wl)] {
                let gain = *rng.pick(&SAMPLE_GAINS);
                let channels = fluorescence_channels(wl, excitation, gain, brightness, &mut rng);
                sheet.block(
                    &format!("{well}{suffix}"),
                    &fluorescence_attributes(excitation, gain),
                    wl,
                    &channels,
                )?;
            }
            blocks += 3;
        }

        // a luminescence read the pipeline skips, and a well nobody declared
        sheet.block(
            "1",
            &[("Mode", "Luminescence".to_string())],
            &abs_wl[..3],
            &[vec![1.0, 2.0, 3.0]],
        )?;
        sheet.block(
            "24",
            &absorbance_attributes(),
            &abs_wl,
            &[generate_spectrum(&abs_wl, &[], 0.1, 0.01, &mut rng)],
        )?;
        blocks += 2;
        sheet.finish()?;
    }

    // ---- fluorescence baselines ----
    let mut baseline = SheetWriter::create(&out.join("fluorescence_baseline.csv"), t0)?;
    for (excitation, wl) in [(350, &ex350_wl), (400, &ex400_wl)] {
        for gain in BASELINE_GAINS {
            let channels = fluorescence_channels(wl, excitation, gain, 0.0, &mut rng);
            baseline.block(
                &format!("baseline {excitation}"),
                &fluorescence_attributes(excitation, gain),
                wl,
                &channels,
            )?;
        }
    }
    baseline.finish()?;

    // ---- config ----
    let config = serde_json::json!({
        "input_dir": out,
        "output_dir": out.join("reports"),
        "match_policy": "tolerant",
        "subtract_background": true
    });
    std::fs::write(out.join("config.json"), serde_json::to_string_pretty(&config)?)?;

    println!(
        "Wrote {} samples and {blocks} measurement blocks on {PLATES} plates to {}",
        wells.len(),
        out.display()
    );
    Ok(())
}
