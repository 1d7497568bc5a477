use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// CellValue – a single worksheet cell
// ---------------------------------------------------------------------------

/// A dynamically-typed worksheet cell, as handed over by the sheet layer.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl CellValue {
    /// Empty cells and whitespace-only text both count as blank.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the cell; text is parsed after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            CellValue::Text(s) => s.trim().parse().ok(),
            CellValue::Empty => None,
        }
    }

    /// Non-negative whole number view, used for plate, well, gain and
    /// excitation wavelength cells.
    pub fn as_u32(&self) -> Option<u32> {
        let v = self.as_f64()?;
        if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
            Some(v as u32)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Spectrum kinds and channels
// ---------------------------------------------------------------------------

/// Which measurement a spectrum belongs to, derived from the scan label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectrumKind {
    Abs,
    Ex350,
    Ex400,
}

impl SpectrumKind {
    pub const ALL: [SpectrumKind; 3] = [SpectrumKind::Abs, SpectrumKind::Ex350, SpectrumKind::Ex400];

    pub fn key(self) -> &'static str {
        match self {
            SpectrumKind::Abs => "abs",
            SpectrumKind::Ex350 => "ex350",
            SpectrumKind::Ex400 => "ex400",
        }
    }
}

impl fmt::Display for SpectrumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Excitation wavelengths the fluorescence baselines are calibrated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Excitation {
    Nm350,
    Nm400,
}

impl Excitation {
    pub fn from_nm(nm: u32) -> Result<Self> {
        match nm {
            350 => Ok(Excitation::Nm350),
            400 => Ok(Excitation::Nm400),
            other => Err(SpectraError::UnsupportedExcitation(other)),
        }
    }

    pub fn nm(self) -> u32 {
        match self {
            Excitation::Nm350 => 350,
            Excitation::Nm400 => 400,
        }
    }

    pub fn kind(self) -> SpectrumKind {
        match self {
            Excitation::Nm350 => SpectrumKind::Ex350,
            Excitation::Nm400 => SpectrumKind::Ex400,
        }
    }
}

impl fmt::Display for Excitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ex{}", self.nm())
    }
}

/// Named intensity channel. Absorbance scans carry one channel; fluorescence
/// scans carry the four reactant channels in a fixed row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Channel {
    Abs,
    Aq,
    Cu,
    Fe,
    Cd,
}

impl Channel {
    /// Row order of the fluorescence channels below the `Wavel.` row.
    pub const FLUORESCENCE: [Channel; 4] = [Channel::Aq, Channel::Cu, Channel::Fe, Channel::Cd];

    pub fn key(self) -> &'static str {
        match self {
            Channel::Abs => "Abs",
            Channel::Aq => "Aq",
            Channel::Cu => "Cu",
            Channel::Fe => "Fe",
            Channel::Cd => "Cd",
        }
    }

    /// Human readable name used in reports.
    pub fn display_name(self) -> &'static str {
        match self {
            Channel::Abs => "Absorbance",
            Channel::Aq => "Water",
            Channel::Cu => "Copper",
            Channel::Fe => "Iron",
            Channel::Cd => "Cadmium",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

pub type ChannelMap = BTreeMap<Channel, Vec<f64>>;

// ---------------------------------------------------------------------------
// Spectrum – one instrument scan
// ---------------------------------------------------------------------------

/// Measurement mode plus its mode-specific metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Absorbance,
    Fluorescence { gain: u32, excitation_nm: u32 },
}

/// A single scan: one wavelength axis shared by every channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub wavelengths: Vec<f64>,
    pub channels: ChannelMap,
    pub mode: Mode,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Spectrum {
    pub fn gain(&self) -> Option<u32> {
        match self.mode {
            Mode::Fluorescence { gain, .. } => Some(gain),
            Mode::Absorbance => None,
        }
    }

    /// Kind implied by the acquisition metadata. Fails for fluorescence
    /// scans excited at a wavelength with no baseline support.
    pub fn kind(&self) -> Result<SpectrumKind> {
        match self.mode {
            Mode::Absorbance => Ok(SpectrumKind::Abs),
            Mode::Fluorescence { excitation_nm, .. } => {
                Excitation::from_nm(excitation_nm).map(Excitation::kind)
            }
        }
    }

    /// Uncorrected values of one channel.
    pub fn channel(&self, channel: Channel) -> Result<&[f64]> {
        self.channels
            .get(&channel)
            .map(Vec::as_slice)
            .ok_or_else(|| SpectraError::UnknownChannel(channel.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Sample – one well of the plate map
// ---------------------------------------------------------------------------

/// A physical sample declared in the plate map.
#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    pub label: String,
    pub plate: u32,
    pub well: u32,
    pub class: String,
    pub comment: Option<String>,
    pub reactants: Vec<String>,
    #[serde(serialize_with = "serialize_kinds")]
    pub spectra: BTreeMap<SpectrumKind, Spectrum>,
}

fn serialize_kinds<S: serde::Serializer>(
    spectra: &BTreeMap<SpectrumKind, Spectrum>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(spectra.keys())
}

impl Sample {
    pub fn new(
        label: impl Into<String>,
        plate: u32,
        well: u32,
        class: impl Into<String>,
        comment: Option<String>,
        reactants: Vec<String>,
    ) -> Self {
        Sample {
            label: label.into(),
            plate,
            well,
            class: class.into(),
            comment,
            reactants,
            spectra: BTreeMap::new(),
        }
    }

    pub fn spectrum(&self, kind: SpectrumKind) -> Option<&Spectrum> {
        self.spectra.get(&kind)
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.spectra.keys().map(|k| k.key()).collect();
        write!(
            f,
            "<Sample label:{}, class:{}, plate:{}, well:{}, spectra:[{}]>",
            self.label,
            self.class,
            self.plate,
            self.well,
            kinds.join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_numeric_views() {
        assert_eq!(CellValue::from(" 2.5 ").as_f64(), Some(2.5));
        assert_eq!(CellValue::Number(60.0).as_u32(), Some(60));
        assert_eq!(CellValue::Number(60.5).as_u32(), None);
        assert_eq!(CellValue::Empty.as_f64(), None);
        assert!(CellValue::from("  ").is_empty());
    }

    #[test]
    fn test_excitation_kind() {
        assert_eq!(Excitation::from_nm(350).unwrap().kind(), SpectrumKind::Ex350);
        assert_eq!(Excitation::from_nm(400).unwrap().kind(), SpectrumKind::Ex400);
        assert!(matches!(
            Excitation::from_nm(450),
            Err(SpectraError::UnsupportedExcitation(450))
        ));
    }
}
