use super::model::CellValue;
use crate::error::{Result, SpectraError};

/// Cell text the instrument writes for saturated readings.
pub const OVERFLOW_MARKER: &str = "OVER";

/// Convert a worksheet row into a numeric vector.
///
/// * cell 0 is the row header and is dropped
/// * `OVER` becomes NaN
/// * the first empty cell truncates the vector (ragged trailing columns)
/// * any other non-numeric cell is an error
pub fn row_to_vector(row: &[CellValue]) -> Result<Vec<f64>> {
    let cells = row.get(1..).unwrap_or(&[]);
    let mut out = Vec::with_capacity(cells.len());

    for (j, cell) in cells.iter().enumerate() {
        if cell.is_empty() {
            break;
        }
        match cell {
            CellValue::Text(s) if s.trim() == OVERFLOW_MARKER => out.push(f64::NAN),
            _ => {
                let v = cell.as_f64().ok_or_else(|| SpectraError::NotANumber {
                    index: j + 1,
                    value: cell.to_string(),
                })?;
                out.push(v);
            }
        }
    }
    Ok(out)
}
