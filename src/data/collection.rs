use std::sync::OnceLock;

use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::builder::build_spectrum;
use super::locator::{label_rows, BlockLocator, LabelBlock, LABEL_PREFIX};
use super::model::{CellValue, Sample, Spectrum, SpectrumKind};
use super::sheet::Sheet;
use crate::error::{Result, SpectraError};

/// Worksheet columns of a measurement block.
const ATTRIBUTE_COL: usize = 0;
const VALUE_COL: usize = 4;
const TIME_COL: usize = 1;

/// How a (plate, well) lookup treats a miss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// No sample or several samples is an error.
    #[default]
    Strict,
    /// No sample is reported and the scan discarded; several is still an error.
    Tolerant,
}

// ---------------------------------------------------------------------------
// Label and sheet-name parsing
// ---------------------------------------------------------------------------

/// Parse a scan label such as `Label: 12a` into its well and kind.
///
/// A trailing `a` marks the 350 nm fluorescence scan, `b` the 400 nm one,
/// and no letter the absorbance scan.
pub fn parse_scan_label(label: &str) -> Result<(u32, SpectrumKind)> {
    let bad = || SpectraError::BadLabel(label.to_string());
    let body = label
        .trim()
        .strip_prefix(LABEL_PREFIX.trim_end())
        .ok_or_else(bad)?
        .trim();
    let last = body.chars().last().ok_or_else(bad)?;

    let (digits, kind) = if last.is_alphabetic() {
        let kind = match last {
            'a' => SpectrumKind::Ex350,
            'b' => SpectrumKind::Ex400,
            other => {
                warn!("label '{label}' has unknown suffix '{other}', treated as absorbance");
                SpectrumKind::Abs
            }
        };
        (&body[..body.len() - last.len_utf8()], kind)
    } else {
        (body, SpectrumKind::Abs)
    };

    let well = digits.trim().parse::<u32>().map_err(|_| bad())?;
    Ok((well, kind))
}

fn trailing_digits() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([0-9]+)$").expect("static regex"))
}

/// Plate number encoded as the trailing digits of a worksheet name.
pub fn plate_from_sheet_name(name: &str) -> Result<u32> {
    trailing_digits()
        .captures(name.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| SpectraError::BadSheetName(name.to_string()))
}

// ---------------------------------------------------------------------------
// Block → spectrum
// ---------------------------------------------------------------------------

/// Read the cells of a located block and build its spectrum.
pub fn spectrum_from_block<S: Sheet + ?Sized>(sheet: &S, block: &LabelBlock) -> Result<Option<Spectrum>> {
    let names = sheet.column_range(ATTRIBUTE_COL, block.metadata_rows());
    let values = sheet.column_range(VALUE_COL, block.metadata_rows());
    let rows: Vec<Vec<CellValue>> = block.data_rows.clone().map(|r| sheet.row(r)).collect();

    build_spectrum(
        &sheet.cell(block.start_time_row, TIME_COL),
        &sheet.cell(block.end_time_row, TIME_COL),
        &names,
        &values,
        &rows,
    )
}

/// Every spectrum of a sheet, in block order. Used for baseline sheets,
/// which are not tied to samples.
pub fn read_sheet_spectra<S: Sheet + ?Sized>(sheet: &S) -> Result<Vec<Spectrum>> {
    let column = sheet.column(0);
    let mut spectra = Vec::new();
    for block in BlockLocator::new(sheet.name(), &column) {
        let block = block?;
        if let Some(spectrum) = spectrum_from_block(sheet, &block)? {
            spectra.push(spectrum);
        }
    }
    Ok(spectra)
}

// ---------------------------------------------------------------------------
// SampleCollection
// ---------------------------------------------------------------------------

/// All samples of a run, as declared by the plate map.
#[derive(Debug, Clone, Default)]
pub struct SampleCollection {
    pub samples: Vec<Sample>,
}

/// Counters for one ingested measurement sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub blocks: usize,
    pub attached: usize,
    pub discarded: usize,
    pub skipped_mode: usize,
}

impl SampleCollection {
    pub fn new(samples: Vec<Sample>) -> Self {
        SampleCollection { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Build the collection from a plate map sheet.
    ///
    /// Columns: A marker (`Plate`, `A`, `E`), B plate number or well column,
    /// C sample label, D and E reactants, F class, G comment. Row `A` starts
    /// the first half of a plate (wells 1..12), row `E` the second (13..24).
    pub fn from_plate_map<S: Sheet + ?Sized>(sheet: &S) -> Result<Self> {
        let mut samples = Vec::new();
        let mut plate: Option<u32> = None;
        let mut well_offset: Option<u32> = None;

        for r in 0..sheet.row_count() {
            let cell = |c: usize| sheet.cell(r, c);
            let bad = |reason: &str| SpectraError::BadPlateMap {
                row: r + 1,
                reason: reason.to_string(),
            };

            match cell(0).as_str().map(str::trim) {
                Some("Plate") => {
                    plate = Some(cell(1).as_u32().ok_or_else(|| bad("plate number is not an integer"))?);
                }
                Some("A") => well_offset = Some(0),
                Some("E") => well_offset = Some(12),
                _ => {}
            }

            let label = cell(2);
            if label.is_empty() {
                continue;
            }
            let plate = plate.ok_or_else(|| bad("sample before any 'Plate' row"))?;
            let offset = well_offset.ok_or_else(|| bad("sample before any 'A' or 'E' row"))?;
            let column = cell(1).as_u32().ok_or_else(|| bad("well column is not an integer"))?;

            let reactants = [cell(3), cell(4)]
                .into_iter()
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string().trim().to_string())
                .collect();
            let class = cell(5).to_string().trim().to_uppercase();
            let comment = Some(cell(6))
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string().trim().to_string());

            samples.push(Sample::new(
                label.to_string().trim(),
                plate,
                offset + column,
                class,
                comment,
                reactants,
            ));
        }

        info!("plate map '{}': {} samples", sheet.name(), samples.len());
        Ok(SampleCollection { samples })
    }

    /// Exactly one sample at (plate, well), or `None` for a tolerated miss.
    pub fn find_mut(&mut self, plate: u32, well: u32, policy: MatchPolicy) -> Result<Option<&mut Sample>> {
        let mut hits = self
            .samples
            .iter_mut()
            .filter(|s| s.plate == plate && s.well == well);
        let first = hits.next();
        let extra = hits.count();

        match (first, policy) {
            (Some(_), _) if extra > 0 => Err(SpectraError::AmbiguousSample {
                plate,
                well,
                count: extra + 1,
            }),
            (Some(sample), _) => Ok(Some(sample)),
            (None, MatchPolicy::Strict) => Err(SpectraError::NoSample { plate, well }),
            (None, MatchPolicy::Tolerant) => {
                warn!("plate={plate}, well={well}: no sample declared, discarding data");
                Ok(None)
            }
        }
    }

    /// Read-only strict lookup.
    pub fn find(&self, plate: u32, well: u32) -> Result<&Sample> {
        let mut hits = self.samples.iter().filter(|s| s.plate == plate && s.well == well);
        match (hits.next(), hits.count()) {
            (Some(sample), 0) => Ok(sample),
            (Some(_), extra) => Err(SpectraError::AmbiguousSample {
                plate,
                well,
                count: extra + 1,
            }),
            (None, _) => Err(SpectraError::NoSample { plate, well }),
        }
    }

    /// Parse every block of a measurement sheet for `plate` and attach the
    /// spectra to their samples.
    pub fn ingest_sheet<S: Sheet + ?Sized>(
        &mut self,
        sheet: &S,
        plate: u32,
        policy: MatchPolicy,
    ) -> Result<IngestStats> {
        let column = sheet.column(0);
        debug!("{}: {} labels", sheet.name(), label_rows(&column).count());

        let mut stats = IngestStats::default();
        for block in BlockLocator::new(sheet.name(), &column) {
            let block = block?;
            stats.blocks += 1;

            let (well, kind) = parse_scan_label(&block.label)?;
            let Some(sample) = self.find_mut(plate, well, policy)? else {
                stats.discarded += 1;
                continue;
            };
            match spectrum_from_block(sheet, &block)? {
                Some(spectrum) => {
                    if sample.spectra.insert(kind, spectrum).is_some() {
                        warn!("{}: replacing {kind} spectrum of sample {}", sheet.name(), sample.label);
                    }
                    stats.attached += 1;
                }
                None => stats.skipped_mode += 1,
            }
        }

        info!(
            "{} (plate {plate}): {} blocks, {} attached, {} discarded, {} skipped",
            sheet.name(),
            stats.blocks,
            stats.attached,
            stats.discarded,
            stats.skipped_mode
        );
        Ok(stats)
    }
}
