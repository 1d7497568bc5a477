use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::debug;
use serde_json::Value as JsonValue;

use super::model::CellValue;
use super::sheet::Worksheet;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Whether `path` has an extension [`load_sheet`] understands.
pub fn is_sheet_file(path: &Path) -> bool {
    matches!(extension(path).as_str(), "csv" | "json")
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn sheet_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string()
}

/// Load one worksheet from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`  – one worksheet row per record, no header row, ragged records allowed
/// * `.json` – `[[cell, cell, ...], ...]` with string / number / null cells
///
/// The sheet is named after the file stem.
pub fn load_sheet(path: &Path) -> Result<Worksheet> {
    let rows = match extension(path).as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        other => bail!("Unsupported sheet extension: .{other}"),
    }
    .with_context(|| format!("loading sheet {}", path.display()))?;

    debug!("{}: {} rows", path.display(), rows.len());
    Ok(Worksheet::new(sheet_name(path), rows))
}

/// Load every sheet file of a directory, ordered by sheet name.
pub fn load_workbook_dir(dir: &Path) -> Result<Vec<Worksheet>> {
    if !dir.is_dir() {
        bail!("{} is not an existing directory", dir.display());
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()
        .with_context(|| format!("listing {}", dir.display()))?;
    paths.retain(|p| p.is_file() && is_sheet_file(p));
    paths.sort();

    paths.iter().map(|p| load_sheet(p)).collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Zero-length lines are dropped by the reader; empty worksheet rows must be
/// written as a record of empty fields (`,` or `""`), as spreadsheet
/// exports do.
fn load_csv(path: &Path) -> Result<Vec<Vec<CellValue>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }
    Ok(rows)
}

/// Numeric text becomes a number, empty text an empty cell.
pub fn guess_cell_type(s: &str) -> CellValue {
    if s.trim().is_empty() {
        return CellValue::Empty;
    }
    if let Ok(f) = s.trim().parse::<f64>() {
        // keep "NaN"/"inf" spelled out in the export as text
        if f.is_finite() {
            return CellValue::Number(f);
        }
    }
    CellValue::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (rows of cells):
///
/// ```json
/// [
///   ["Label: 1"],
///   ["Mode", null, null, null, "Absorbance"],
///   ["Wavel.", 300, 310, 320]
/// ]
/// ```
fn load_json(path: &Path) -> Result<Vec<Vec<CellValue>>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    records
        .iter()
        .enumerate()
        .map(|(i, rec)| -> Result<Vec<CellValue>> {
            let cells = rec
                .as_array()
                .with_context(|| format!("Row {i} is not a JSON array"))?;
            Ok(cells.iter().map(json_to_cell).collect())
        })
        .collect()
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::Null => CellValue::Empty,
        JsonValue::String(s) if s.is_empty() => CellValue::Empty,
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => n
            .as_f64()
            .map(CellValue::Number)
            .unwrap_or_else(|| CellValue::Text(n.to_string())),
        JsonValue::Bool(b) => CellValue::Text(b.to_string()),
        other => CellValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sheet::Sheet;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rusty-cqd-loader-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_guess_cell_type() {
        assert_eq!(guess_cell_type(""), CellValue::Empty);
        assert_eq!(guess_cell_type("  "), CellValue::Empty);
        assert_eq!(guess_cell_type("0.25"), CellValue::Number(0.25));
        assert_eq!(guess_cell_type("OVER"), CellValue::from("OVER"));
        assert_eq!(guess_cell_type("NaN"), CellValue::from("NaN"));
        assert_eq!(
            guess_cell_type("2024-10-07 10:00:00"),
            CellValue::from("2024-10-07 10:00:00")
        );
    }

    #[test]
    fn test_load_csv_and_json_sheets() {
        let dir = scratch_dir("formats");
        std::fs::write(dir.join("Sheet2.csv"), "Label: 1\nWavel.,300,310,,\nA1,0.1,OVER\n").unwrap();
        std::fs::write(
            dir.join("Sheet1.json"),
            r#"[["Label: 2a"], ["Gain", null, null, null, 80], ["Wavel.", 400, ""]]"#,
        )
        .unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let sheets = load_workbook_dir(&dir).unwrap();
        let names: Vec<&str> = sheets.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Sheet1", "Sheet2"]);

        let json = &sheets[0];
        assert_eq!(json.cell(1, 4), CellValue::Number(80.0));
        assert_eq!(json.cell(1, 1), CellValue::Empty);
        assert_eq!(json.cell(2, 2), CellValue::Empty);

        let csv = &sheets[1];
        assert_eq!(csv.row_count(), 3);
        assert_eq!(csv.cell(1, 3), CellValue::Empty);
        assert_eq!(csv.cell(2, 2), CellValue::from("OVER"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unsupported_extension_and_missing_dir() {
        assert!(load_sheet(Path::new("map.xlsx")).is_err());
        assert!(load_workbook_dir(Path::new("/definitely/not/here")).is_err());
    }
}
