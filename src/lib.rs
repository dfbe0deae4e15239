//! GrubPeek - canteen menu publishing service
//!
//! This library turns hand-authored weekly menu spreadsheets into dish
//! records keyed by calendar date, persists them in SQLite, and serves them
//! over an HTTP JSON API.
//!
//! # Features
//!
//! - Anchor date recovery from Chinese date fragments in filenames
//! - Worksheet grid extraction: meal sections, weekday-to-date column
//!   mapping, category carry-down, multi-dish cell splitting
//! - Conflict-aware, transactional imports (a date is replaced whole or not
//!   at all)
//! - Calendar queries, uploaded-file management, admin auth
//!
//! # Example
//!
//! ```no_run
//! use grubpeek::import::parse_menu_file;
//! use std::path::Path;
//!
//! let path = Path::new("菜单2026年1月4日-9日.xlsx");
//! let extraction = parse_menu_file(path, "菜单2026年1月4日-9日.xlsx")?;
//!
//! println!("Records: {}", extraction.records.len());
//! println!("Rows skipped: {}", extraction.rows_skipped);
//! # Ok::<(), grubpeek::error::GrubError>(())
//! ```

pub mod api;
pub mod cli;
pub mod db;
pub mod error;
pub mod extract;
pub mod import;
pub mod sheet;
pub mod types;

// Re-export commonly used types
pub use error::{GrubError, GrubResult};
pub use extract::{anchor_date, extract_dishes, Extraction};
pub use types::{DishRecord, Meal, MenuItem};
