//! Spreadsheet loading: file on disk → in-memory cell grid.
//!
//! The extraction core works on plain text cells; this module is the only
//! place that knows about workbook formats. Like the site it feeds, only the
//! first worksheet of a file is ever read.

use crate::error::{GrubError, GrubResult};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

/// Load the first worksheet of a spreadsheet file as a row-major grid of
/// trimmed cell text. Blank and error cells become empty strings.
pub fn load_grid<P: AsRef<Path>>(path: P) -> GrubResult<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto(&path)
        .map_err(|e| GrubError::Sheet(format!("failed to open spreadsheet: {e}")))?;
    first_sheet_grid(&mut workbook)
}

/// Same as [`load_grid`] but for a workbook already held in memory, e.g. an
/// upload body that has not been written to disk yet.
pub fn load_grid_from_bytes(bytes: Vec<u8>) -> GrubResult<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| GrubError::Sheet(format!("failed to open spreadsheet: {e}")))?;
    first_sheet_grid(&mut workbook)
}

fn first_sheet_grid<RS, R>(workbook: &mut R) -> GrubResult<Vec<Vec<String>>>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| GrubError::Sheet("workbook has no worksheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| GrubError::Sheet(format!("failed to read worksheet {sheet_name:?}: {e}")))?;

    Ok(range_to_grid(&range))
}

/// Render a calamine cell range into text rows.
fn range_to_grid(range: &Range<Data>) -> Vec<Vec<String>> {
    range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect()
}

/// Best-effort scalar-to-text conversion. Floats that carry an integer value
/// print without a trailing `.0` so numeric-typed label cells still match.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}
