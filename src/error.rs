use thiserror::Error;

/// Errors raised while turning worksheet regions into spectra and while
/// correcting them against the background model.
#[derive(Debug, Error)]
pub enum SpectraError {
    // -- structural: the export no longer matches the expected layout --
    #[error("sheet '{sheet}': marker '{marker}' not found after label row {label_row}")]
    MissingMarker {
        sheet: String,
        marker: &'static str,
        label_row: usize,
    },

    #[error("cell {index} ('{value}') is not a number")]
    NotANumber { index: usize, value: String },

    #[error("'{value}' is not a timestamp of the form YYYY-MM-DD HH:MM:SS")]
    BadTimestamp { value: String },

    #[error("attribute '{0}' missing from measurement block")]
    MissingAttribute(&'static str),

    #[error("attribute '{name}' has invalid value '{value}'")]
    BadAttribute { name: &'static str, value: String },

    #[error("data row {0} missing from measurement block")]
    MissingDataRow(usize),

    #[error("channel {channel} has {got} values but the wavelength vector has {expected}")]
    ChannelLength {
        channel: String,
        expected: usize,
        got: usize,
    },

    #[error("wavelength vector mismatch: {0}")]
    WavelengthMismatch(String),

    #[error("invalid scan label '{0}'")]
    BadLabel(String),

    #[error("invalid plate map row {row}: {reason}")]
    BadPlateMap { row: usize, reason: String },

    #[error("invalid worksheet name '{0}': no trailing plate number")]
    BadSheetName(String),

    // -- data integrity: plate map and measurements contradict each other --
    #[error("plate={plate}, well={well} matches no sample")]
    NoSample { plate: u32, well: u32 },

    #[error("plate={plate}, well={well} matches {count} samples, expected exactly 1")]
    AmbiguousSample { plate: u32, well: u32, count: usize },

    #[error("{0} background queried before initialization")]
    Uninitialized(String),

    #[error("{0} background already initialized")]
    AlreadyInitialized(String),

    #[error("unsupported excitation wavelength {0} nm")]
    UnsupportedExcitation(u32),

    #[error("spectrum has no channel '{0}'")]
    UnknownChannel(String),

    #[error("baseline spectrum is not a fluorescence reading")]
    NotFluorescence,
}

impl SpectraError {
    /// Malformed-export errors.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            SpectraError::MissingMarker { .. }
                | SpectraError::NotANumber { .. }
                | SpectraError::BadTimestamp { .. }
                | SpectraError::MissingAttribute(_)
                | SpectraError::BadAttribute { .. }
                | SpectraError::MissingDataRow(_)
                | SpectraError::ChannelLength { .. }
                | SpectraError::WavelengthMismatch(_)
                | SpectraError::BadLabel(_)
                | SpectraError::BadPlateMap { .. }
                | SpectraError::BadSheetName(_)
        )
    }

    /// Contradictions between the plate map, the measurements and the
    /// background state.
    pub fn is_data_integrity(&self) -> bool {
        !self.is_structural()
    }
}

pub type Result<T> = std::result::Result<T, SpectraError>;
