use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::info;

use crate::config::RunConfig;
use crate::data::collection::SampleCollection;
use crate::data::loader::{load_sheet, load_workbook_dir};
use crate::report::{write_sample_report, write_summary};
use crate::state::RunState;

// ---------------------------------------------------------------------------
// Batch run: plate map → measurements → backgrounds → reports
// ---------------------------------------------------------------------------

pub struct CqdApp {
    pub config: RunConfig,
}

/// What a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub state: RunState,
    pub reports: Vec<PathBuf>,
}

impl CqdApp {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Parse every input and build the reference backgrounds.
    pub fn load(&self) -> Result<RunState> {
        let config = &self.config;
        if !config.input_dir.is_dir() {
            bail!("{} is not an existing directory", config.input_dir.display());
        }

        let map_path = config.plate_map_path();
        if !map_path.is_file() {
            bail!("{} does not exist", map_path.display());
        }
        let map = load_sheet(&map_path)?;
        let collection = SampleCollection::from_plate_map(&map)
            .with_context(|| format!("parsing plate map {}", map_path.display()))?;
        let mut state = RunState::new(collection);

        let measurements = load_workbook_dir(&config.measurements_path())?;
        info!("{} measurement sheets", measurements.len());
        for sheet in &measurements {
            state
                .ingest_measurements(sheet, config.match_policy)
                .with_context(|| format!("parsing measurement sheet '{}'", sheet.name))?;
        }

        let baseline_path = config.fluorescence_baseline_path();
        if !baseline_path.is_file() {
            bail!("{} does not exist", baseline_path.display());
        }
        let baseline = load_sheet(&baseline_path)?;
        state
            .init_background(&baseline, &config.blank_comments)
            .with_context(|| format!("initializing background from {}", baseline_path.display()))?;

        Ok(state)
    }

    /// Load all inputs and write one report per selected sample plus a
    /// JSON summary.
    pub fn run(&self) -> Result<RunOutcome> {
        let state = self.load()?;
        let config = &self.config;

        std::fs::create_dir_all(&config.output_dir)
            .with_context(|| format!("creating {}", config.output_dir.display()))?;

        let samples = state.visible_samples(&config.report_classes);
        let mut reports = Vec::with_capacity(samples.len());
        for sample in &samples {
            reports.push(write_sample_report(
                sample,
                &state.background,
                config.subtract_background,
                &config.output_dir,
            )?);
        }
        write_summary(samples.iter().copied(), &config.output_dir.join("summary.json"))?;

        info!(
            "{} reports written to {} ({} blocks read, {} attached, {} discarded, {} skipped)",
            reports.len(),
            config.output_dir.display(),
            state.stats.blocks,
            state.stats.attached,
            state.stats.discarded,
            state.stats.skipped_mode
        );
        Ok(RunOutcome { state, reports })
    }
}
