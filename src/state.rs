use std::collections::BTreeSet;

use log::info;

use crate::data::background::BackgroundModel;
use crate::data::collection::{
    plate_from_sheet_name, read_sheet_spectra, IngestStats, MatchPolicy, SampleCollection,
};
use crate::data::filter::{blank_samples, filtered_indices};
use crate::data::model::Sample;
use crate::data::sheet::Sheet;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Everything one run accumulates, independent of where the sheets came from.
#[derive(Debug, Default)]
pub struct RunState {
    /// Samples declared by the plate map, with their attached spectra.
    pub collection: SampleCollection,

    /// Reference backgrounds; initialized after all measurements are in.
    pub background: BackgroundModel,

    /// Totals over all ingested measurement sheets.
    pub stats: IngestStats,
}

impl RunState {
    pub fn new(collection: SampleCollection) -> Self {
        Self {
            collection,
            ..Default::default()
        }
    }

    /// Ingest one measurement sheet; the plate number comes from the
    /// sheet name.
    pub fn ingest_measurements<S: Sheet + ?Sized>(&mut self, sheet: &S, policy: MatchPolicy) -> Result<()> {
        let plate = plate_from_sheet_name(sheet.name())?;
        let stats = self.collection.ingest_sheet(sheet, plate, policy)?;
        self.stats.blocks += stats.blocks;
        self.stats.attached += stats.attached;
        self.stats.discarded += stats.discarded;
        self.stats.skipped_mode += stats.skipped_mode;
        Ok(())
    }

    /// Build both backgrounds: fluorescence from the baseline sheet,
    /// absorbance from the blank samples of the collection.
    pub fn init_background<S: Sheet + ?Sized>(&mut self, baseline_sheet: &S, blank_comments: &[String]) -> Result<()> {
        let baselines = read_sheet_spectra(baseline_sheet)?;
        self.background.init_fluorescence(&baselines)?;

        let blanks = blank_samples(&self.collection, blank_comments);
        info!("{} blank samples", blanks.len());
        self.background.init_absorbance(blanks)?;
        Ok(())
    }

    /// Samples selected for reporting.
    pub fn visible_samples(&self, classes: &BTreeSet<String>) -> Vec<&Sample> {
        filtered_indices(&self.collection, classes)
            .into_iter()
            .map(|i| &self.collection.samples[i])
            .collect()
    }
}
