//! Cron schedule expressions.

use crate::errors::ScheduleError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn cron_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^cron\((?:[0-9A-Za-z*?/,#-]+ ){5}[0-9A-Za-z*?/,#-]+\)$")
            .expect("cron pattern is a valid regex")
    })
}

/// A validated six-field `cron(...)` expression
/// (`minute hour day-of-month month day-of-week year`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Schedule(String);

impl Schedule {
    /// Daily ETL: 09:00 UTC every day.
    pub const DAILY_ETL: &'static str = "cron(0 9 * * ? *)";

    /// Monthly report: 12:00 UTC on the 2nd of each month.
    pub const MONTHLY_REPORT: &'static str = "cron(0 12 2 * ? *)";

    /// Parses and validates an expression.
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let trimmed = expression.trim();
        if cron_pattern().is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ScheduleError {
                expression: expression.to_string(),
            })
        }
    }

    /// The daily ETL schedule.
    #[must_use]
    pub fn daily_etl() -> Self {
        Self(Self::DAILY_ETL.to_string())
    }

    /// The monthly report schedule.
    #[must_use]
    pub fn monthly_report() -> Self {
        Self(Self::MONTHLY_REPORT.to_string())
    }

    /// The expression text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Schedule {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Schedule> for String {
    fn from(schedule: Schedule) -> Self {
        schedule.0
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
