use std::ops::Range;

use log::debug;

use super::model::CellValue;
use crate::error::{Result, SpectraError};

pub const LABEL_PREFIX: &str = "Label: ";
pub const START_TIME: &str = "Start Time:";
pub const END_TIME: &str = "End Time:";
pub const WAVELENGTH_ROW: &str = "Wavel.";

/// Row positions of one measurement block in a worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelBlock {
    /// Full text of the label cell, e.g. `Label: 12a`.
    pub label: String,
    pub label_row: usize,
    pub start_time_row: usize,
    pub end_time_row: usize,
    /// Rows from the `Wavel.` row up to the first empty column-A cell.
    pub data_rows: Range<usize>,
}

impl LabelBlock {
    /// Attribute rows between the label and the start time.
    pub fn metadata_rows(&self) -> Range<usize> {
        self.label_row + 1..self.start_time_row
    }
}

fn is_label(cell: &CellValue) -> bool {
    cell.as_str().is_some_and(|s| s.starts_with(LABEL_PREFIX))
}

fn is_marker(cell: &CellValue, marker: &str) -> bool {
    cell.as_str() == Some(marker)
}

/// Row indices of all label cells in a column. Finite, and restartable by
/// calling again.
pub fn label_rows(column: &[CellValue]) -> impl Iterator<Item = usize> + '_ {
    column
        .iter()
        .enumerate()
        .filter(|(_, c)| is_label(c))
        .map(|(i, _)| i)
}

// ---------------------------------------------------------------------------
// Block scanner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum ScanState {
    SeekingLabel,
    SeekingStartTime {
        label: usize,
    },
    SeekingEndTime {
        label: usize,
        start: usize,
    },
    SeekingWavelengthRow {
        label: usize,
        start: usize,
        end: usize,
    },
    ConsumingDataRows {
        label: usize,
        start: usize,
        end: usize,
        wavelength: usize,
    },
}

/// Iterates the measurement blocks of a worksheet's column A.
///
/// Each marker is looked up from the label row onward, independently of the
/// others, so the export may place `End Time:` before or after the data.
/// A missing marker yields one error and ends the iteration.
pub struct BlockLocator<'a> {
    sheet: &'a str,
    column: &'a [CellValue],
    next_label: usize,
    failed: bool,
}

impl<'a> BlockLocator<'a> {
    pub fn new(sheet: &'a str, column: &'a [CellValue]) -> Self {
        BlockLocator {
            sheet,
            column,
            next_label: 0,
            failed: false,
        }
    }

    fn missing(&mut self, marker: &'static str, label_row: usize) -> SpectraError {
        self.failed = true;
        SpectraError::MissingMarker {
            sheet: self.sheet.to_string(),
            marker,
            label_row,
        }
    }
}

impl Iterator for BlockLocator<'_> {
    type Item = Result<LabelBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let mut state = ScanState::SeekingLabel;
        let mut cursor = self.next_label;

        loop {
            let cell = self.column.get(cursor);
            match state {
                ScanState::SeekingLabel => match cell {
                    None => {
                        self.next_label = cursor;
                        return None;
                    }
                    Some(c) if is_label(c) => {
                        self.next_label = cursor + 1;
                        state = ScanState::SeekingStartTime { label: cursor };
                    }
                    Some(_) => cursor += 1,
                },
                ScanState::SeekingStartTime { label } => match cell {
                    None => return Some(Err(self.missing(START_TIME, label))),
                    Some(c) if is_marker(c, START_TIME) => {
                        state = ScanState::SeekingEndTime {
                            label,
                            start: cursor,
                        };
                        cursor = label;
                    }
                    Some(_) => cursor += 1,
                },
                ScanState::SeekingEndTime { label, start } => match cell {
                    None => return Some(Err(self.missing(END_TIME, label))),
                    Some(c) if is_marker(c, END_TIME) => {
                        state = ScanState::SeekingWavelengthRow {
                            label,
                            start,
                            end: cursor,
                        };
                        cursor = label;
                    }
                    Some(_) => cursor += 1,
                },
                ScanState::SeekingWavelengthRow { label, start, end } => match cell {
                    None => return Some(Err(self.missing(WAVELENGTH_ROW, label))),
                    Some(c) if is_marker(c, WAVELENGTH_ROW) => {
                        state = ScanState::ConsumingDataRows {
                            label,
                            start,
                            end,
                            wavelength: cursor,
                        };
                    }
                    Some(_) => cursor += 1,
                },
                ScanState::ConsumingDataRows {
                    label,
                    start,
                    end,
                    wavelength,
                } => match cell {
                    Some(c) if !c.is_empty() => cursor += 1,
                    _ => {
                        let block = LabelBlock {
                            label: self.column[label].to_string(),
                            label_row: label,
                            start_time_row: start,
                            end_time_row: end,
                            data_rows: wavelength..cursor,
                        };
                        debug!("{}: block '{}' at row {}", self.sheet, block.label, label);
                        return Some(Ok(block));
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(cells: &[&str]) -> Vec<CellValue> {
        cells
            .iter()
            .map(|s| {
                if s.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::from(*s)
                }
            })
            .collect()
    }

    fn sample_column() -> Vec<CellValue> {
        column(&[
            "Application: Tecan i-control",
            "",
            "Label: 1",
            "Mode",
            "Wavelength start",
            "Start Time:",
            "",
            "Wavel.",
            "A1",
            "",
            "End Time:",
            "",
            "Label: 2a",
            "Mode",
            "Start Time:",
            "Wavel.",
            "A2",
            "B2",
            "C2",
            "D2",
            "",
            "End Time:",
        ])
    }

    #[test]
    fn test_label_rows() {
        let col = sample_column();
        let rows: Vec<usize> = label_rows(&col).collect();
        assert_eq!(rows, vec![2, 12]);
        // restartable
        assert_eq!(label_rows(&col).count(), 2);
    }

    #[test]
    fn test_locates_blocks() {
        let col = sample_column();
        let blocks: Vec<LabelBlock> = BlockLocator::new("Sheet1", &col)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(blocks.len(), 2);

        let first = &blocks[0];
        assert_eq!(first.label, "Label: 1");
        assert_eq!(first.start_time_row, 5);
        assert_eq!(first.end_time_row, 10);
        assert_eq!(first.data_rows, 7..9);
        assert_eq!(first.metadata_rows(), 3..5);

        let second = &blocks[1];
        assert_eq!(second.label, "Label: 2a");
        assert_eq!(second.data_rows, 15..20);
        assert_eq!(second.end_time_row, 21);
    }

    #[test]
    fn test_data_rows_run_to_end_of_column() {
        let col = column(&["Label: 3", "Start Time:", "End Time:", "Wavel.", "A3"]);
        let blocks: Vec<LabelBlock> = BlockLocator::new("s", &col)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(blocks[0].data_rows, 3..5);
    }

    #[test]
    fn test_missing_marker_is_fatal() {
        let col = column(&["Label: 1", "Mode", "Start Time:", "Wavel.", "A1"]);
        let mut it = BlockLocator::new("Sheet7", &col);
        match it.next() {
            Some(Err(SpectraError::MissingMarker {
                marker, label_row, ..
            })) => {
                assert_eq!(marker, END_TIME);
                assert_eq!(label_row, 0);
            }
            other => panic!("expected missing marker, got {other:?}"),
        }
        assert!(it.next().is_none());
    }

    #[test]
    fn test_no_labels_yields_nothing() {
        let col = column(&["Application", "", "Start Time:"]);
        assert_eq!(BlockLocator::new("s", &col).count(), 0);
    }
}
