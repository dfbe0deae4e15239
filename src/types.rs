use crate::error::GrubError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//==============================================================================
// Meal classification
//==============================================================================

/// The meal block a dish belongs to.
///
/// `Takeaway` is derived, never read literally from a worksheet section
/// header: a category containing 外卖 forces it regardless of the enclosing
/// section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
    Takeaway,
}

impl Meal {
    /// Default price in yuan. Prices are never read from the sheet.
    pub fn default_price(self) -> i64 {
        match self {
            Meal::Breakfast => 5,
            Meal::Lunch => 25,
            Meal::Dinner => 15,
            Meal::Takeaway => 0,
        }
    }

    /// Database/wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Meal::Breakfast => "breakfast",
            Meal::Lunch => "lunch",
            Meal::Dinner => "dinner",
            Meal::Takeaway => "takeaway",
        }
    }
}

impl fmt::Display for Meal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Meal {
    type Err = GrubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(Meal::Breakfast),
            "lunch" => Ok(Meal::Lunch),
            "dinner" => Ok(Meal::Dinner),
            "takeaway" => Ok(Meal::Takeaway),
            other => Err(GrubError::UnknownMeal(other.to_string())),
        }
    }
}

//==============================================================================
// Dish records
//==============================================================================

/// One dish appearing on one date for one meal, as extracted from a
/// worksheet. A value object: no identity until persisted, and the extractor
/// never deduplicates or merges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishRecord {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub meal: Meal,
    /// Carried down from the nearest preceding non-blank first-column cell
    /// within the current section; empty if none seen yet.
    pub category: String,
    /// A single dish name, already split out of a multi-dish cell. The
    /// `[特]` marker, when present, is retained verbatim.
    pub name: String,
    pub featured: bool,
    pub price: i64,
    /// `row * 1000 + col`; restores presentation order after grouping.
    pub sort_order: i64,
}

impl DishRecord {
    /// Build a record from one split cell piece, applying the takeaway
    /// override and meal-based default price.
    pub fn from_piece(
        date: NaiveDate,
        section: Meal,
        category: &str,
        name: String,
        row: usize,
        col: usize,
    ) -> Self {
        let meal = if category.contains("外卖") {
            Meal::Takeaway
        } else {
            section
        };
        let featured = name.contains(FEATURED_MARKER);
        Self {
            date,
            meal,
            category: category.to_string(),
            name,
            featured,
            price: meal.default_price(),
            sort_order: (row * 1000 + col) as i64,
        }
    }
}

/// Literal marker flagging a featured dish inside raw cell text.
pub const FEATURED_MARKER: &str = "[特]";

/// A persisted dish row, as stored in and served from the `menus` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MenuItem {
    pub id: i64,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub meal: String,
    pub category: String,
    pub name: String,
    pub is_featured: bool,
    pub price: i64,
    pub sort_order: i64,
}
