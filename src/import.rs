//! Conflict-aware import pipeline: spreadsheet → records → database.
//!
//! Parsing is pure and happens before any write, so a file that fails to
//! parse (no anchor date, unreadable workbook) never touches the database.
//! Persisting goes through [`Db::replace_for_dates`], which atomically
//! replaces every affected calendar date.

use crate::db::Db;
use crate::error::{GrubError, GrubResult};
use crate::extract::{self, Extraction};
use crate::sheet;
use crate::types::DishRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// Outcome of a completed import.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportReport {
    /// Rows inserted. The primary success signal: zero on a non-empty file
    /// means the sheet's layout did not match the expected pattern.
    pub count: u64,
    /// Distinct dates that were replaced.
    pub dates: Vec<NaiveDate>,
}

/// Parse a spreadsheet file on disk. `filename` is the original upload name
/// carrying the date fragments; it may differ from the on-disk path.
pub fn parse_menu_file(path: &Path, filename: &str) -> GrubResult<Extraction> {
    let grid = sheet::load_grid(path)?;
    extract_from_grid(&grid, filename)
}

/// Parse a spreadsheet already held in memory.
pub fn parse_menu_bytes(bytes: Vec<u8>, filename: &str) -> GrubResult<Extraction> {
    let grid = sheet::load_grid_from_bytes(bytes)?;
    extract_from_grid(&grid, filename)
}

fn extract_from_grid(grid: &[Vec<String>], filename: &str) -> GrubResult<Extraction> {
    let anchor = extract::anchor_date(filename)
        .ok_or_else(|| GrubError::AnchorDateMissing(filename.to_string()))?;
    Ok(extract::extract_dishes(anchor, grid))
}

/// The distinct dates a record set touches, in calendar order.
pub fn distinct_dates(records: &[DishRecord]) -> Vec<NaiveDate> {
    let set: BTreeSet<NaiveDate> = records.iter().map(|r| r.date).collect();
    set.into_iter().collect()
}

/// Which target dates already hold data. Empty result means the import can
/// proceed without clobbering anything.
pub async fn check_conflicts(db: &Db, records: &[DishRecord]) -> GrubResult<Vec<NaiveDate>> {
    db.dates_with_data(&distinct_dates(records)).await
}

/// Persist the records, transactionally replacing all prior rows for the
/// affected dates.
pub async fn import_records(db: &Db, records: &[DishRecord]) -> GrubResult<ImportReport> {
    let dates = distinct_dates(records);
    let count = db.replace_for_dates(records).await?;
    info!(count, dates = dates.len(), "menu import complete");
    Ok(ImportReport { count, dates })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Meal;
    use pretty_assertions::assert_eq;

    fn record(date: NaiveDate, name: &str) -> DishRecord {
        DishRecord::from_piece(date, Meal::Lunch, "热菜", name.to_string(), 2, 1)
    }

    #[test]
    fn test_distinct_dates_sorted_and_deduped() {
        let d1 = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 1, 4).unwrap();
        let records = vec![record(d1, "a"), record(d2, "b"), record(d1, "c")];
        assert_eq!(distinct_dates(&records), vec![d2, d1]);
    }

    #[test]
    fn test_anchorless_filename_is_fatal() {
        let grid = vec![vec!["早餐".to_string()]];
        let err = extract_from_grid(&grid, "menu.xlsx").unwrap_err();
        assert!(matches!(err, GrubError::AnchorDateMissing(_)));
    }
}
