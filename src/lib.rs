//! Plate-reader spectrum ingestion: measurement sheets are split into label
//! blocks, turned into spectra, attached to the samples of a plate map and
//! written out as background-corrected per-sample reports.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod state;

pub use app::{CqdApp, RunOutcome};
pub use config::RunConfig;
pub use error::SpectraError;
