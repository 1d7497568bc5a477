use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::data::collection::MatchPolicy;
use crate::data::filter::default_blank_comments;

/// Settings of one run. Every field has a default, so a config file only
/// needs the entries it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    /// Measurement sheets, one per plate; relative to `input_dir`.
    pub measurements_dir: PathBuf,
    pub plate_map: PathBuf,
    pub fluorescence_baseline: PathBuf,
    pub output_dir: PathBuf,
    pub match_policy: MatchPolicy,
    pub subtract_background: bool,
    /// Plate-map comments marking water-only wells.
    pub blank_comments: Vec<String>,
    /// Classes to write reports for; empty means all.
    pub report_classes: BTreeSet<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            measurements_dir: PathBuf::from("measurements"),
            plate_map: PathBuf::from("plate_map.csv"),
            fluorescence_baseline: PathBuf::from("fluorescence_baseline.csv"),
            output_dir: PathBuf::from("reports"),
            match_policy: MatchPolicy::Strict,
            subtract_background: true,
            blank_comments: default_blank_comments(),
            report_classes: BTreeSet::new(),
        }
    }
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening config {}", path.display()))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load the config named on the command line (or the defaults) and
    /// apply the command-line overrides.
    pub fn with_cli_args(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(dir) = &cli.input_dir {
            config.input_dir = dir.clone();
        }
        if let Some(dir) = &cli.output_dir {
            config.output_dir = dir.clone();
        }
        if cli.tolerant {
            config.match_policy = MatchPolicy::Tolerant;
        }
        if cli.raw {
            config.subtract_background = false;
        }
        Ok(config)
    }

    pub fn measurements_path(&self) -> PathBuf {
        self.input_dir.join(&self.measurements_dir)
    }

    pub fn plate_map_path(&self) -> PathBuf {
        self.input_dir.join(&self.plate_map)
    }

    pub fn fluorescence_baseline_path(&self) -> PathBuf {
        self.input_dir.join(&self.fluorescence_baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RunConfig =
            serde_json::from_str(r#"{ "input_dir": "/data/run1", "match_policy": "tolerant" }"#).unwrap();
        assert_eq!(config.match_policy, MatchPolicy::Tolerant);
        assert!(config.subtract_background);
        assert_eq!(config.plate_map_path(), PathBuf::from("/data/run1/plate_map.csv"));
        assert_eq!(config.measurements_path(), PathBuf::from("/data/run1/measurements"));
        assert_eq!(config.blank_comments.len(), 7);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli {
            input_dir: Some(PathBuf::from("in")),
            output_dir: Some(PathBuf::from("out")),
            tolerant: true,
            raw: true,
            ..Default::default()
        };
        let config = RunConfig::with_cli_args(&cli).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("in"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.match_policy, MatchPolicy::Tolerant);
        assert!(!config.subtract_background);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        assert!(serde_json::from_str::<RunConfig>(r#"{ "match_policy": "lenient" }"#).is_err());
    }
}
