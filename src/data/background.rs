use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use log::{debug, info, warn};

use super::model::{Channel, ChannelMap, Excitation, Mode, Sample, Spectrum, SpectrumKind};
use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// Baseline state
// ---------------------------------------------------------------------------

/// Initialization state of one kind of baseline.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Baseline<T> {
    /// The init operation has not run yet.
    #[default]
    Pending,
    /// The init operation ran but had no input to build from.
    Empty,
    Ready(T),
}

impl<T> Baseline<T> {
    pub fn is_initialized(&self) -> bool {
        !matches!(self, Baseline::Pending)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Baseline::Ready(t) => Some(t),
            _ => None,
        }
    }
}

/// Mean of the blank samples' absorbance scans.
#[derive(Debug, Clone, PartialEq)]
pub struct AbsorbanceBaseline {
    pub wavelengths: Vec<f64>,
    pub mean: Vec<f64>,
    pub blank_count: usize,
}

/// Baseline channel sets of one excitation wavelength, keyed by gain.
#[derive(Debug, Clone, PartialEq)]
pub struct FluorescenceBaselines {
    pub wavelengths: Vec<f64>,
    pub by_gain: BTreeMap<u32, ChannelMap>,
}

// ---------------------------------------------------------------------------
// Subtraction result
// ---------------------------------------------------------------------------

/// How a corrected spectrum was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Absorbance minus the blank mean.
    BlankMean,
    /// Fluorescence minus the baseline measured at the same gain.
    ExactGain(u32),
    /// Fluorescence minus a baseline interpolated between two gains.
    Interpolated { under: u32, over: u32, fraction: f64 },
    /// Gain outside the calibrated range; channels are returned as measured.
    Uncorrected { gain: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Corrected {
    pub channels: ChannelMap,
    pub correction: Correction,
}

impl Corrected {
    pub fn is_applied(&self) -> bool {
        !matches!(self.correction, Correction::Uncorrected { .. })
    }
}

fn subtract_vec(values: &[f64], baseline: &[f64]) -> Vec<f64> {
    values.iter().zip(baseline).map(|(v, b)| v - b).collect()
}

fn interpolate_vec(under: &[f64], over: &[f64], fraction: f64) -> Vec<f64> {
    under
        .iter()
        .zip(over)
        .map(|(u, o)| u + (o - u) * fraction)
        .collect()
}

fn baseline_channel<'a>(set: &'a ChannelMap, channel: Channel) -> Result<&'a [f64]> {
    set.get(&channel)
        .map(Vec::as_slice)
        .ok_or_else(|| SpectraError::UnknownChannel(channel.to_string()))
}

// ---------------------------------------------------------------------------
// BackgroundModel
// ---------------------------------------------------------------------------

/// Reference background spectra for one run.
///
/// Built once by the pipeline from the blank samples and the fluorescence
/// baseline measurements, then only read.
#[derive(Debug, Clone, Default)]
pub struct BackgroundModel {
    absorbance: Baseline<AbsorbanceBaseline>,
    fluorescence: Baseline<BTreeMap<Excitation, FluorescenceBaselines>>,
}

impl BackgroundModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorbance(&self) -> &Baseline<AbsorbanceBaseline> {
        &self.absorbance
    }

    pub fn fluorescence(&self, excitation: Excitation) -> Option<&FluorescenceBaselines> {
        self.fluorescence.ready().and_then(|m| m.get(&excitation))
    }

    /// Both init operations have run.
    pub fn is_initialized(&self) -> bool {
        self.absorbance.is_initialized() && self.fluorescence.is_initialized()
    }

    /// Whether `subtract` can correct spectra of `kind`.
    pub fn supports(&self, kind: SpectrumKind) -> bool {
        match kind {
            SpectrumKind::Abs => self.absorbance.ready().is_some(),
            SpectrumKind::Ex350 => self.fluorescence(Excitation::Nm350).is_some(),
            SpectrumKind::Ex400 => self.fluorescence(Excitation::Nm400).is_some(),
        }
    }

    /// Average the absorbance scans of the blank samples.
    ///
    /// Blanks without an absorbance scan are skipped. All remaining scans
    /// must share one wavelength vector.
    pub fn init_absorbance<'a, I>(&mut self, blank_samples: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        if self.absorbance.is_initialized() {
            return Err(SpectraError::AlreadyInitialized("absorbance".into()));
        }

        let mut wavelengths: Option<&[f64]> = None;
        let mut sum: Vec<f64> = Vec::new();
        let mut count = 0usize;

        for sample in blank_samples {
            let Some(spectrum) = sample.spectrum(SpectrumKind::Abs) else {
                debug!("blank {} has no absorbance scan", sample.label);
                continue;
            };
            let values = spectrum.channel(Channel::Abs)?;
            match wavelengths {
                None => {
                    wavelengths = Some(&spectrum.wavelengths);
                    sum = vec![0.0; values.len()];
                }
                Some(wl) if wl != spectrum.wavelengths.as_slice() => {
                    return Err(SpectraError::WavelengthMismatch(format!(
                        "absorbance background: sample {sample} has a different wavelength vector"
                    )));
                }
                Some(_) => {}
            }
            for (acc, v) in sum.iter_mut().zip(values) {
                *acc += v;
            }
            count += 1;
        }

        self.absorbance = match wavelengths {
            Some(wl) => {
                let mean = sum.iter().map(|s| s / count as f64).collect();
                info!("absorbance background from {count} blank samples");
                Baseline::Ready(AbsorbanceBaseline {
                    wavelengths: wl.to_vec(),
                    mean,
                    blank_count: count,
                })
            }
            None => {
                warn!("no blank sample has an absorbance scan, absorbance background unavailable");
                Baseline::Empty
            }
        };
        Ok(())
    }

    /// Register fluorescence baseline scans by excitation wavelength and gain.
    ///
    /// The first scan of each excitation wavelength fixes its wavelength
    /// vector. A later scan at an already registered gain replaces it.
    pub fn init_fluorescence<'a, I>(&mut self, baseline_spectra: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Spectrum>,
    {
        if self.fluorescence.is_initialized() {
            return Err(SpectraError::AlreadyInitialized("fluorescence".into()));
        }

        let mut sets: BTreeMap<Excitation, FluorescenceBaselines> = BTreeMap::new();
        for spectrum in baseline_spectra {
            let Mode::Fluorescence { gain, excitation_nm } = spectrum.mode else {
                return Err(SpectraError::NotFluorescence);
            };
            let excitation = Excitation::from_nm(excitation_nm)?;

            let set = sets
                .entry(excitation)
                .or_insert_with(|| FluorescenceBaselines {
                    wavelengths: spectrum.wavelengths.clone(),
                    by_gain: BTreeMap::new(),
                });
            if set.wavelengths != spectrum.wavelengths {
                return Err(SpectraError::WavelengthMismatch(format!(
                    "{excitation} baseline at gain {gain} has a different wavelength vector"
                )));
            }
            if set
                .by_gain
                .insert(gain, spectrum.channels.clone())
                .is_some()
            {
                warn!("{excitation} baseline at gain {gain} given twice, keeping the last one");
            }
        }

        for (ex, set) in &sets {
            let gains: Vec<u32> = set.by_gain.keys().copied().collect();
            info!("{ex} fluorescence baselines at gains {gains:?}");
        }
        self.fluorescence = if sets.is_empty() {
            warn!("no fluorescence baselines, fluorescence background unavailable");
            Baseline::Empty
        } else {
            Baseline::Ready(sets)
        };
        Ok(())
    }

    /// Background-corrected copy of every channel of `spectrum`.
    pub fn subtract(&self, spectrum: &Spectrum) -> Result<Corrected> {
        self.correct(spectrum, None)
    }

    /// Background-corrected values of a single channel.
    pub fn subtract_channel(&self, spectrum: &Spectrum, channel: Channel) -> Result<Vec<f64>> {
        spectrum.channel(channel)?;
        let mut corrected = self.correct(spectrum, Some(channel))?;
        corrected
            .channels
            .remove(&channel)
            .ok_or_else(|| SpectraError::UnknownChannel(channel.to_string()))
    }

    fn correct(&self, spectrum: &Spectrum, only: Option<Channel>) -> Result<Corrected> {
        let selected = spectrum
            .channels
            .iter()
            .filter(|(ch, _)| only.map_or(true, |o| o == **ch));

        match spectrum.mode {
            Mode::Absorbance => {
                let bg = self
                    .absorbance
                    .ready()
                    .ok_or_else(|| SpectraError::Uninitialized("absorbance".into()))?;
                if bg.wavelengths != spectrum.wavelengths {
                    return Err(SpectraError::WavelengthMismatch(
                        "spectrum differs from the absorbance background".into(),
                    ));
                }
                let channels = selected
                    .map(|(ch, v)| (*ch, subtract_vec(v, &bg.mean)))
                    .collect();
                Ok(Corrected {
                    channels,
                    correction: Correction::BlankMean,
                })
            }
            Mode::Fluorescence { gain, excitation_nm } => {
                let excitation = Excitation::from_nm(excitation_nm)?;
                let set = self
                    .fluorescence(excitation)
                    .ok_or_else(|| SpectraError::Uninitialized(format!("{excitation} fluorescence")))?;
                if set.wavelengths != spectrum.wavelengths {
                    return Err(SpectraError::WavelengthMismatch(format!(
                        "spectrum differs from the {excitation} baseline"
                    )));
                }

                if let Some(base) = set.by_gain.get(&gain) {
                    let channels = selected
                        .map(|(ch, v)| Ok((*ch, subtract_vec(v, baseline_channel(base, *ch)?))))
                        .collect::<Result<ChannelMap>>()?;
                    return Ok(Corrected {
                        channels,
                        correction: Correction::ExactGain(gain),
                    });
                }

                let under = set.by_gain.range(..gain).next_back();
                let over = set.by_gain.range((Excluded(gain), Unbounded)).next();
                let (Some((&g_under, b_under)), Some((&g_over, b_over))) = (under, over) else {
                    warn!(
                        "{excitation} gain {gain} outside calibrated baselines, background not subtracted"
                    );
                    return Ok(Corrected {
                        channels: selected.map(|(ch, v)| (*ch, v.clone())).collect(),
                        correction: Correction::Uncorrected { gain },
                    });
                };

                let fraction = (gain - g_under) as f64 / (g_over - g_under) as f64;
                let channels = selected
                    .map(|(ch, v)| {
                        let base = interpolate_vec(
                            baseline_channel(b_under, *ch)?,
                            baseline_channel(b_over, *ch)?,
                            fraction,
                        );
                        Ok((*ch, subtract_vec(v, &base)))
                    })
                    .collect::<Result<ChannelMap>>()?;
                Ok(Corrected {
                    channels,
                    correction: Correction::Interpolated {
                        under: g_under,
                        over: g_over,
                        fraction,
                    },
                })
            }
        }
    }
}
