//! Deployment parameter validation.
//!
//! A pure gate: no I/O, no ambient state. Every check runs on every call and
//! the violations are collected, so one pass reports everything wrong with
//! a configuration.

use super::settings::{LogLevel, Region, RemovalPolicy};
use super::RawConfig;
use crate::errors::{ConfigViolation, ConfigurationError};

/// How far a projection year may sit from the current year.
pub const PROJECTION_YEAR_WINDOW: i32 = 10;

/// Accepted `bufferHintSize` range, in MiB.
pub const BUFFER_HINT_SIZE_RANGE: std::ops::RangeInclusive<i64> = 64..=128;

/// Accepted `bufferHintInterval` range, in seconds.
pub const BUFFER_HINT_INTERVAL_RANGE: std::ops::RangeInclusive<i64> = 60..=900;

/// Validates a raw configuration against the given calendar year.
///
/// Returns `Ok(())` only if every present field passes.
pub fn validate(config: &RawConfig, current_year: i32) -> Result<(), ConfigurationError> {
    let mut violations = Vec::new();

    violations.extend(check_region(config.region.as_deref()));
    violations.extend(check_log_level(config.log_level.as_deref()));
    violations.extend(check_removal_policy(config.removal_policy.as_deref()));
    violations.extend(check_projection_year(
        "projectionYearMin",
        &config.projection_year_min,
        current_year,
    ));
    violations.extend(check_projection_year(
        "projectionYearMax",
        &config.projection_year_max,
        current_year,
    ));
    violations.extend(check_buffer_hint(
        "bufferHintSize",
        &config.buffer_hint_size,
        BUFFER_HINT_SIZE_RANGE,
    ));
    violations.extend(check_buffer_hint(
        "bufferHintInterval",
        &config.buffer_hint_interval,
        BUFFER_HINT_INTERVAL_RANGE,
    ));

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ConfigurationError::new(violations))
    }
}

fn check_region(region: Option<&str>) -> Option<ConfigViolation> {
    let region = region?;
    if region.parse::<Region>().is_ok() {
        return None;
    }
    let allowed: Vec<&str> = Region::ALL.iter().map(Region::as_str).collect();
    Some(ConfigViolation::new(
        "region",
        format!("Stack region must be one of: {}", allowed.join(", ")),
    ))
}

fn check_log_level(level: Option<&str>) -> Option<ConfigViolation> {
    let level = level?;
    level.parse::<LogLevel>().is_err().then(|| {
        ConfigViolation::new("logLevel", "LOG_LEVEL must be ERROR, WARN, DEBUG, or INFO")
    })
}

fn check_removal_policy(policy: Option<&str>) -> Option<ConfigViolation> {
    let policy = policy?;
    policy.parse::<RemovalPolicy>().is_err().then(|| {
        ConfigViolation::new(
            "removalPolicy",
            "REMOVAL_POLICY must be DESTROY, SNAPSHOT, or RETAIN",
        )
    })
}

/// Parses a projection year: exactly four ASCII digits.
///
/// A sign or padding is a format error, so `"-202"` is rejected here rather
/// than reaching the range check.
pub fn parse_projection_year(value: &str) -> Option<i32> {
    if value.len() != 4 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn check_projection_year(field: &str, value: &str, current_year: i32) -> Option<ConfigViolation> {
    let Some(year) = parse_projection_year(value) else {
        return Some(ConfigViolation::new(
            field,
            "Invalid year format, please provide a valid 4-digit year",
        ));
    };

    let window = (current_year - PROJECTION_YEAR_WINDOW)..=(current_year + PROJECTION_YEAR_WINDOW);
    (!window.contains(&year)).then(|| {
        ConfigViolation::new(field, format!("Year must be within 10 years of {current_year}"))
    })
}

fn check_buffer_hint(
    field: &str,
    value: &str,
    range: std::ops::RangeInclusive<i64>,
) -> Option<ConfigViolation> {
    let Ok(parsed) = value.trim().parse::<i64>() else {
        return Some(ConfigViolation::new(
            field,
            format!("Invalid {field} format, please provide a valid number"),
        ));
    };

    (!range.contains(&parsed)).then(|| {
        ConfigViolation::new(
            field,
            format!("{field} must be between {} and {}", range.start(), range.end()),
        )
    })
}
