//! Calendar helpers for run dates and report months.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use thiserror::Error;

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Days subtracted from today when no report month is given.
const REPORT_LOOKBACK_DAYS: i64 = 7;

/// Errors that can occur while resolving dates from trigger input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateInputError {
    /// The `Date` field is not a `YYYY-MM-DD` calendar date.
    #[error("Invalid Date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The `Month` field is not a month number.
    #[error("Invalid Month '{0}': expected a number from 1 to 12")]
    InvalidMonth(String),
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Returns the current UTC calendar date.
#[must_use]
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Returns the current UTC calendar year.
#[must_use]
pub fn current_year() -> i32 {
    Utc::now().year()
}

/// Resolves the date of records a transform run should process.
///
/// An explicit `Date` field (`YYYY-MM-DD`) in the trigger input wins;
/// otherwise the run processes yesterday relative to `today`.
pub fn run_date(input: &serde_json::Value, today: NaiveDate) -> Result<NaiveDate, DateInputError> {
    match input.get("Date") {
        Some(value) => {
            let raw = value
                .as_str()
                .ok_or_else(|| DateInputError::InvalidDate(value.to_string()))?;
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| DateInputError::InvalidDate(raw.to_string()))
        }
        None => Ok(today - Duration::days(1)),
    }
}

/// Resolves the month a billing report covers.
///
/// An explicit `Month` field (number or numeric string) wins; otherwise the
/// month of the date one week before `today` is used.
pub fn report_month(input: &serde_json::Value, today: NaiveDate) -> Result<u32, DateInputError> {
    let Some(value) = input.get("Month") else {
        return Ok((today - Duration::days(REPORT_LOOKBACK_DAYS)).month());
    };

    let parsed = match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|m| u32::try_from(m).ok()),
        serde_json::Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };

    match parsed {
        Some(month) if (1..=12).contains(&month) => Ok(month),
        _ => Err(DateInputError::InvalidMonth(
            value.as_str().map_or_else(|| value.to_string(), str::to_string),
        )),
    }
}
