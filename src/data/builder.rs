use chrono::NaiveDateTime;
use log::warn;

use super::model::{CellValue, Channel, ChannelMap, Mode, Spectrum};
use super::vector::row_to_vector;
use crate::error::{Result, SpectraError};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const MODE_ATTRIBUTE: &str = "Mode";
pub const GAIN_ATTRIBUTE: &str = "Gain";
pub const EXCITATION_ATTRIBUTE: &str = "Excitation Wavelength";

pub const ABSORBANCE_MODE: &str = "Absorbance";
pub const FLUORESCENCE_MODE: &str = "Fluorescence Top Reading";

fn parse_timestamp(cell: &CellValue) -> Result<NaiveDateTime> {
    let text = cell.to_string();
    NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT)
        .map_err(|_| SpectraError::BadTimestamp { value: text })
}

/// Value paired with the first attribute named `name`.
fn attribute<'a>(
    names: &[CellValue],
    values: &'a [CellValue],
    name: &'static str,
) -> Result<&'a CellValue> {
    let idx = names
        .iter()
        .position(|n| n.as_str().map(str::trim) == Some(name))
        .ok_or(SpectraError::MissingAttribute(name))?;
    Ok(values.get(idx).unwrap_or(&CellValue::Empty))
}

fn numeric_attribute(names: &[CellValue], values: &[CellValue], name: &'static str) -> Result<u32> {
    let cell = attribute(names, values, name)?;
    cell.as_u32().ok_or_else(|| SpectraError::BadAttribute {
        name,
        value: cell.to_string(),
    })
}

fn data_vector(rows: &[Vec<CellValue>], idx: usize) -> Result<Vec<f64>> {
    let row = rows.get(idx).ok_or(SpectraError::MissingDataRow(idx))?;
    row_to_vector(row)
}

fn channel_vector(
    rows: &[Vec<CellValue>],
    idx: usize,
    channel: Channel,
    expected: usize,
) -> Result<Vec<f64>> {
    let v = data_vector(rows, idx)?;
    if v.len() != expected {
        return Err(SpectraError::ChannelLength {
            channel: channel.to_string(),
            expected,
            got: v.len(),
        });
    }
    Ok(v)
}

/// Build a spectrum from the cells of one measurement block.
///
/// `attribute_names` and `attribute_values` are the column-A and column-E
/// cells of the block's metadata rows; `data_rows[0]` is the `Wavel.` row.
///
/// Returns `Ok(None)` for measurement modes other than absorbance and top
/// fluorescence: the block carries no usable data but the sheet is fine.
pub fn build_spectrum(
    start_time: &CellValue,
    end_time: &CellValue,
    attribute_names: &[CellValue],
    attribute_values: &[CellValue],
    data_rows: &[Vec<CellValue>],
) -> Result<Option<Spectrum>> {
    let mode_cell = attribute(attribute_names, attribute_values, MODE_ATTRIBUTE)?;
    let mode = match mode_cell.as_str().map(str::trim) {
        Some(ABSORBANCE_MODE) => Mode::Absorbance,
        Some(FLUORESCENCE_MODE) => Mode::Fluorescence {
            gain: numeric_attribute(attribute_names, attribute_values, GAIN_ATTRIBUTE)?,
            excitation_nm: numeric_attribute(attribute_names, attribute_values, EXCITATION_ATTRIBUTE)?,
        },
        _ => {
            warn!("{mode_cell} is not a valid mode, block skipped");
            return Ok(None);
        }
    };

    let start = parse_timestamp(start_time)?;
    let end = parse_timestamp(end_time)?;

    let wavelengths = data_vector(data_rows, 0)?;
    let n = wavelengths.len();

    let mut channels = ChannelMap::new();
    match mode {
        Mode::Absorbance => {
            channels.insert(Channel::Abs, channel_vector(data_rows, 1, Channel::Abs, n)?);
        }
        Mode::Fluorescence { .. } => {
            for (i, ch) in Channel::FLUORESCENCE.into_iter().enumerate() {
                channels.insert(ch, channel_vector(data_rows, i + 1, ch, n)?);
            }
        }
    }

    Ok(Some(Spectrum {
        wavelengths,
        channels,
        mode,
        start,
        end,
    }))
}
