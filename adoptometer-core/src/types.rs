//! Core domain types for adoptometer
//!
//! These types model the aggregation pipeline's data flow:
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | One raw observation of a user running the tool |
//! | **CommandInvocation** | One raw command-line invocation, independent stream |
//! | **DailyActivity** | One row per (user, day), derived by grouping Events |
//! | **UserLifespan** | First and last observed activity day per user |
//! | **Sustained user** | A user whose lifespan span exceeds the configured threshold |
//! | **YearMonth** | A calendar month, rendered as `YYYY-MM` |
//!
//! Raw rows (`Event`, `CommandInvocation`) are immutable and sourced
//! externally. Everything else is derived fresh per run and discarded after
//! the output tables are materialized.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Raw input rows
// ============================================

/// One raw observation: a user ran the tool at some instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Opaque user identifier from the telemetry source
    pub user_id: String,
    /// When the event was recorded
    pub timestamp: DateTime<Utc>,
    /// Tool version reported with the event (if any)
    pub project_version: Option<String>,
    /// CI environment flag; absent and `false` both mean "not CI"
    pub is_ci: Option<bool>,
}

/// One raw command-line invocation.
///
/// Independent stream from [`Event`]; shares the sustained-user gate but
/// not the daily-activity rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandInvocation {
    /// Opaque user identifier from the telemetry source
    pub user_id: String,
    /// When the command was run
    pub timestamp: DateTime<Utc>,
    /// Full command text as typed (e.g., "kedro run --pipeline x")
    pub command: String,
}

// ============================================
// Derived pipeline rows
// ============================================

/// One row per user per day, derived by grouping [`Event`]s.
///
/// `activity_date` is the day-truncation of the event timestamp and
/// `event_count` is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyActivity {
    pub user_id: String,
    pub activity_date: NaiveDate,
    /// Lexicographic max of the first four characters of the versions
    /// observed that day (mirrors the source's `MAX(LEFT(version, 4))`)
    pub version_prefix: Option<String>,
    pub event_count: u64,
}

/// First and last observed activity day for one user.
///
/// Invariant: `first_seen <= last_seen`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLifespan {
    pub user_id: String,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
}

impl UserLifespan {
    /// Observed activity span in whole days.
    ///
    /// A user seen on a single day has a span of 0.
    pub fn span_days(&self) -> i64 {
        (self.last_seen - self.first_seen).num_days()
    }
}

// ============================================
// YearMonth
// ============================================

/// A calendar month, the bucketing key for every output table.
///
/// Displays and serializes as `YYYY-MM`; ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    /// 1-12
    pub month: u32,
}

impl YearMonth {
    /// Month containing the given date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid year-month {:?}, expected YYYY-MM", s))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("invalid year in {:?}", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("invalid month in {:?}", s))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in {:?}", s));
        }
        Ok(Self { year, month })
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================
// Output tables
// ============================================

/// `new_users_monthly`: sustained users whose first activity fell in a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUsersRow {
    pub year_month: YearMonth,
    pub count: u64,
}

/// `mau_monthly`: distinct sustained users active in a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MauRow {
    pub year_month: YearMonth,
    pub mau: u64,
}

/// `plugin_category_mau` / `core_category_mau`: distinct sustained users
/// per (month, command category).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMauRow {
    pub year_month: YearMonth,
    pub category_label: String,
    pub unique_users: u64,
}

/// The canonical four-table report produced by one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdoptionReport {
    pub new_users_monthly: Vec<NewUsersRow>,
    pub mau_monthly: Vec<MauRow>,
    pub plugin_category_mau: Vec<CategoryMauRow>,
    pub core_category_mau: Vec<CategoryMauRow>,
}

/// The two-table variant: just the activity-derived metrics.
///
/// Kept for consumers that predate the command-category metrics; computed
/// from the same stages, so it can never drift from [`AdoptionReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityReport {
    pub new_users_monthly: Vec<NewUsersRow>,
    pub mau_monthly: Vec<MauRow>,
}
