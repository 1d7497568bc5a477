use super::model::CellValue;

/// Read access to one worksheet, independent of the container format.
///
/// Rows and columns are 0-based. Cells outside the stored region read as
/// [`CellValue::Empty`].
pub trait Sheet {
    fn name(&self) -> &str;

    fn row_count(&self) -> usize;

    fn cell(&self, row: usize, col: usize) -> CellValue;

    /// All cells of one row, up to its last stored cell.
    fn row(&self, row: usize) -> Vec<CellValue>;

    /// Column `col` for every row of the sheet.
    fn column(&self, col: usize) -> Vec<CellValue> {
        (0..self.row_count()).map(|r| self.cell(r, col)).collect()
    }

    /// Column `col` restricted to `rows`.
    fn column_range(&self, col: usize, rows: std::ops::Range<usize>) -> Vec<CellValue> {
        rows.map(|r| self.cell(r, col)).collect()
    }
}

/// In-memory worksheet: a named, possibly ragged grid of cells.
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Worksheet {
            name: name.into(),
            rows,
        }
    }
}

impl Sheet for Worksheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, row: usize, col: usize) -> CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .cloned()
            .unwrap_or(CellValue::Empty)
    }

    fn row(&self, row: usize) -> Vec<CellValue> {
        self.rows.get(row).cloned().unwrap_or_default()
    }
}
