//! SQLite storage for persisted menus and the key-value settings store.
//!
//! All writes that touch multiple rows go through a transaction, most
//! importantly [`Db::replace_for_dates`]: an import either fully replaces
//! every affected calendar date or leaves the table untouched.

use crate::error::{GrubError, GrubResult};
use crate::types::{DishRecord, MenuItem};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row};
use std::collections::BTreeSet;
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS menus (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    type TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL,
    is_featured INTEGER NOT NULL DEFAULT 0,
    price INTEGER NOT NULL DEFAULT 0,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_menus_date ON menus(date);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

pub const ADMIN_PASSWORD_KEY: &str = "admin_password";
const DEFAULT_ADMIN_PASSWORD: &str = "admin888";

/// Per-meal record count for one stored date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MealCount {
    #[serde(rename = "type")]
    pub meal: String,
    pub count: i64,
}

/// One entry of the calendar summary: a date that has data, with counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateSummary {
    pub date: NaiveDate,
    pub counts: Vec<MealCount>,
}

/// Fields accepted when updating a single item by hand. The item's date is
/// fixed at insert time and never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemUpdate {
    #[serde(rename = "type")]
    pub meal: String,
    #[serde(default)]
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub price: i64,
}

/// Fields accepted when creating a single item by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFields {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub meal: String,
    #[serde(default)]
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub price: i64,
}

/// Handle to the menus database.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Open (creating if missing) the database file and initialize the
    /// schema. Seeds the default admin password on first run.
    pub async fn connect<P: AsRef<Path>>(path: P) -> GrubResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        Self::init(pool).await
    }

    /// In-memory database, used by tests. Pinned to a single connection so
    /// every caller sees the same memory database.
    pub async fn connect_in_memory() -> GrubResult<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> GrubResult<Self> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        let db = Self { pool };
        if db.setting(ADMIN_PASSWORD_KEY).await?.is_none() {
            db.set_setting(ADMIN_PASSWORD_KEY, DEFAULT_ADMIN_PASSWORD)
                .await?;
        }
        Ok(db)
    }

    //==========================================================================
    // Import path
    //==========================================================================

    /// Atomically replace all rows for every date present in `records`:
    /// delete-then-insert inside one transaction, so a failed import never
    /// leaves a date half-updated. Returns the number of rows inserted.
    pub async fn replace_for_dates(&self, records: &[DishRecord]) -> GrubResult<u64> {
        let dates: BTreeSet<NaiveDate> = records.iter().map(|r| r.date).collect();

        let mut tx = self.pool.begin().await?;
        for date in &dates {
            sqlx::query("DELETE FROM menus WHERE date = ?")
                .bind(date)
                .execute(&mut *tx)
                .await?;
        }
        for rec in records {
            sqlx::query(
                "INSERT INTO menus (date, type, category, name, is_featured, price, sort_order)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(rec.date)
            .bind(rec.meal.as_str())
            .bind(&rec.category)
            .bind(&rec.name)
            .bind(rec.featured)
            .bind(rec.price)
            .bind(rec.sort_order)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(records.len() as u64)
    }

    /// Which of the given dates already have stored rows. Used for the
    /// pre-import conflict check.
    pub async fn dates_with_data(&self, dates: &[NaiveDate]) -> GrubResult<Vec<NaiveDate>> {
        if dates.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<sqlx::Sqlite>::new("SELECT DISTINCT date FROM menus WHERE date IN (");
        let mut separated = qb.separated(", ");
        for date in dates {
            separated.push_bind(*date);
        }
        separated.push_unseparated(") ORDER BY date");
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row.try_get::<NaiveDate, _>("date").map_err(GrubError::from))
            .collect()
    }

    //==========================================================================
    // Queries
    //==========================================================================

    /// All rows in the inclusive date range, in presentation order.
    pub async fn menus_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> GrubResult<Vec<MenuItem>> {
        let items = sqlx::query_as::<_, MenuItem>(
            "SELECT id, date, type, category, name, is_featured, price, sort_order
             FROM menus WHERE date >= ? AND date <= ?
             ORDER BY date, type, category, sort_order",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Every date that has data (newest first) with per-meal counts.
    pub async fn summary(&self) -> GrubResult<Vec<DateSummary>> {
        let rows = sqlx::query(
            "SELECT date, type, COUNT(*) AS count FROM menus
             GROUP BY date, type ORDER BY date DESC, type",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut summaries: Vec<DateSummary> = Vec::new();
        for row in rows {
            let date: NaiveDate = row.try_get("date")?;
            let count = MealCount {
                meal: row.try_get("type")?,
                count: row.try_get("count")?,
            };
            match summaries.last_mut() {
                Some(entry) if entry.date == date => entry.counts.push(count),
                _ => summaries.push(DateSummary {
                    date,
                    counts: vec![count],
                }),
            }
        }
        Ok(summaries)
    }

    //==========================================================================
    // Admin CRUD
    //==========================================================================

    pub async fn insert_item(&self, item: &ItemFields) -> GrubResult<i64> {
        let result = sqlx::query(
            "INSERT INTO menus (date, type, category, name, is_featured, price)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(item.date)
        .bind(&item.meal)
        .bind(&item.category)
        .bind(&item.name)
        .bind(item.is_featured)
        .bind(item.price)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update_item(&self, id: i64, item: &ItemUpdate) -> GrubResult<bool> {
        let result = sqlx::query(
            "UPDATE menus SET name = ?, is_featured = ?, category = ?, price = ?, type = ?
             WHERE id = ?",
        )
        .bind(&item.name)
        .bind(item.is_featured)
        .bind(&item.category)
        .bind(item.price)
        .bind(&item.meal)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_item(&self, id: i64) -> GrubResult<bool> {
        let result = sqlx::query("DELETE FROM menus WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every row for the given dates. Used by the admin calendar.
    pub async fn delete_dates(&self, dates: &[NaiveDate]) -> GrubResult<u64> {
        if dates.is_empty() {
            return Ok(0);
        }
        let mut qb = QueryBuilder::<sqlx::Sqlite>::new("DELETE FROM menus WHERE date IN (");
        let mut separated = qb.separated(", ");
        for date in dates {
            separated.push_bind(*date);
        }
        separated.push_unseparated(")");
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    //==========================================================================
    // Settings / auth
    //==========================================================================

    pub async fn setting(&self, key: &str) -> GrubResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.try_get::<String, _>("value").map_err(GrubError::from))
            .transpose()
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> GrubResult<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn verify_password(&self, password: &str) -> GrubResult<bool> {
        Ok(self
            .setting(ADMIN_PASSWORD_KEY)
            .await?
            .is_some_and(|stored| stored == password))
    }

    /// Change the admin password. The new password must be at least six
    /// characters; the old one must match.
    pub async fn change_password(&self, old: &str, new: &str) -> GrubResult<()> {
        if new.chars().count() < 6 {
            return Err(GrubError::Validation(
                "new password must be at least 6 characters".to_string(),
            ));
        }
        if !self.verify_password(old).await? {
            return Err(GrubError::Validation("old password is incorrect".to_string()));
        }
        self.set_setting(ADMIN_PASSWORD_KEY, new).await
    }
}
