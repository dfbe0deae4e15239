//! Worksheet grid walker: sections, weekday headers, dish cells.

use crate::types::{DishRecord, Meal};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

/// Closed vocabulary mapping weekday header labels to chrono's
/// days-from-Sunday scale (Sunday = 0). Kept as a table rather than inline
/// comparisons so the vocabulary can grow without touching the scan loop.
const WEEKDAY_LABELS: &[(&str, u32)] = &[
    ("星期天", 0),
    ("星期日", 0),
    ("星期一", 1),
    ("星期二", 2),
    ("星期三", 3),
    ("星期四", 4),
    ("星期五", 5),
    ("星期六", 6),
];

/// Section marker keywords, matched as substrings of a row's first cell.
const SECTION_MARKERS: &[(&str, Meal)] = &[
    ("早餐", Meal::Breakfast),
    ("午餐", Meal::Lunch),
    ("晚餐", Meal::Dinner),
];

/// Characters a multi-dish cell may be split on.
const DISH_SEPARATORS: &[char] = &['/', '、', '\n', '，', ','];

/// Result of one grid scan: the records in discovery order plus a
/// diagnostic counter for rows that carried data but matched no section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub records: Vec<DishRecord>,
    /// Populated rows scanned while no section or column map was active.
    /// Non-zero on a non-empty sheet usually means the layout has drifted
    /// from the three-meal-section pattern. Diagnostic only, never an error.
    pub rows_skipped: usize,
}

/// Split raw cell text into individual dish names.
///
/// Splits on `/`, `、`, newline, `，` and `,`; pieces are trimmed and empty
/// pieces dropped, so a cell of bare punctuation yields nothing.
pub fn split_dish_cell(raw: &str) -> Vec<String> {
    raw.split(DISH_SEPARATORS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Walk the grid top to bottom and emit dish records.
///
/// Single pass with four pieces of state: the current meal section, the
/// expected header row index, the column→date map built from that header,
/// and the carried-down category. Row classification priority: section
/// marker, then header row, then data row; anything else is skipped.
///
/// The column map resolves weekday labels against the anchor date:
/// `date = anchor + (label_weekday - anchor_weekday)` days, both on the
/// Sunday=0 scale. The diff may be negative, so a header whose leftmost
/// label precedes the anchor's weekday still lands in the anchor week.
pub fn extract_dishes(anchor: NaiveDate, grid: &[Vec<String>]) -> Extraction {
    let anchor_dow = anchor.weekday().num_days_from_sunday();

    let mut records = Vec::new();
    let mut rows_skipped = 0usize;

    let mut section: Option<Meal> = None;
    let mut header_row: Option<usize> = None;
    // BTreeMap keeps column iteration in left-to-right order.
    let mut column_map: BTreeMap<usize, NaiveDate> = BTreeMap::new();
    let mut category = String::new();

    for (row_idx, row) in grid.iter().enumerate() {
        let first_cell = row.first().map(|s| s.trim()).unwrap_or("");

        // Section marker: 早餐 / 午餐 / 晚餐 anywhere in the first cell.
        // The header is assumed to be the next row.
        let marker = SECTION_MARKERS
            .iter()
            .find(|(kw, _)| first_cell.contains(kw));
        if let Some((_, meal)) = marker {
            section = Some(*meal);
            header_row = Some(row_idx + 1);
            category.clear();
            column_map.clear();
            continue;
        }

        // Header row: map weekday-labelled columns to concrete dates.
        if header_row == Some(row_idx) {
            column_map.clear();
            for (col_idx, cell) in row.iter().enumerate() {
                let label = cell.trim();
                if let Some((_, dow)) = WEEKDAY_LABELS.iter().find(|(kw, _)| *kw == label) {
                    let diff = *dow as i64 - anchor_dow as i64;
                    column_map.insert(col_idx, anchor + Duration::days(diff));
                }
            }
            continue;
        }

        // Data row.
        let in_section = section.is_some() && header_row.is_some_and(|h| row_idx > h);
        if in_section {
            if !first_cell.is_empty() {
                category = first_cell.to_string();
            }
            let current = section.unwrap_or(Meal::Breakfast);
            let mut emitted = false;
            for (&col_idx, &date) in &column_map {
                let Some(raw) = row.get(col_idx) else { continue };
                if raw.trim().is_empty() {
                    continue;
                }
                emitted = true;
                for name in split_dish_cell(raw) {
                    records.push(DishRecord::from_piece(
                        date, current, &category, name, row_idx, col_idx,
                    ));
                }
            }
            if !emitted && row.iter().any(|c| !c.trim().is_empty()) && column_map.is_empty() {
                rows_skipped += 1;
            }
        } else if row.iter().any(|c| !c.trim().is_empty()) {
            rows_skipped += 1;
        }
    }

    Extraction {
        records,
        rows_skipped,
    }
}
