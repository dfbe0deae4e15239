//! Anchor date recovery from uploaded filenames.

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})年").expect("valid year pattern"))
}

fn month_day_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2})月(\d{1,2})[日\-\s]").expect("valid month/day pattern"))
}

/// Extract the anchor date from a filename containing Chinese date
/// fragments.
///
/// Handles names like `省投食堂菜单：2026年1月4日-9日.xlsx` and
/// `省投食堂菜单；1月12-16.et`. A missing `年` fragment defaults to the
/// current system year; a missing month/day fragment means there is no
/// anchor and the whole file must be rejected. Range suffixes ("4日-9日",
/// "12-16") are ignored beyond the first day.
///
/// Returns `None` both when no fragment matches and when the fragments name
/// an impossible date (month 13, Feb 30): construction must fail validity,
/// never roll over.
pub fn anchor_date(filename: &str) -> Option<NaiveDate> {
    let year = match year_re().captures(filename) {
        Some(caps) => caps[1].parse::<i32>().ok()?,
        None => Local::now().year(),
    };

    let caps = month_day_re().captures(filename)?;
    let month = caps[1].parse::<u32>().ok()?;
    let day = caps[2].parse::<u32>().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}
