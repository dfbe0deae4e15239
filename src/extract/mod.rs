//! Spreadsheet-to-structured-data extraction core.
//!
//! Two collaborating pieces:
//! - filename: recovers the anchor date from Chinese date fragments in the
//!   uploaded file's name
//! - grid: walks the worksheet's cell grid and emits dish records, resolving
//!   weekday header labels against the anchor date
//!
//! Both are pure and deterministic: identical input always yields an
//! identical, identically ordered result, which is what makes re-imports
//! idempotent and conflict detection possible.

mod filename;
mod grid;

pub use filename::anchor_date;
pub use grid::{extract_dishes, split_dish_cell, Extraction};
