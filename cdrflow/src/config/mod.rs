//! Deployment configuration.
//!
//! Configuration is read once at startup into a [`RawConfig`], validated,
//! and turned into an immutable [`Config`]. Nothing else in the crate reads
//! the process environment.

mod settings;
pub mod validator;

pub use settings::{Config, LogLevel, Region, RemovalPolicy};
pub use validator::validate;

use crate::errors::{ConfigViolation, ConfigurationError};
use crate::pipelines::{Namespace, ResourceNames, Schedule};
use serde::{Deserialize, Serialize};

/// Default template of the scheduled custom query.
///
/// `{database}` and `{table}` are filled in with the processed CDR table.
pub const DEFAULT_ATHENA_QUERY: &str = "SELECT voiceconnectorId, SUM(billabledurationseconds) as billabledurationseconds, SUM(billabledurationminutes) as billabledurationminutes FROM {database}.{table} WHERE year = YEAR(CURRENT_DATE) AND month = MONTH(CURRENT_DATE) - 1 group by voiceconnectorid;";

/// Default schedule of the custom query report.
pub const DEFAULT_QUERY_CRON: &str = "cron(0 0 1 * ? *)";

/// String-typed deployment record, exactly as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
    /// Target region.
    pub region: Option<String>,
    /// Log verbosity.
    pub log_level: Option<String>,
    /// Data removal policy.
    pub removal_policy: Option<String>,
    /// First year of partition projection.
    pub projection_year_min: String,
    /// Last year of partition projection.
    pub projection_year_max: String,
    /// Stream delivery buffer size hint.
    pub buffer_hint_size: String,
    /// Stream delivery buffer interval hint.
    pub buffer_hint_interval: String,
    /// Existing raw CDR bucket, empty for a new one.
    pub raw_cdrs_bucket_name: String,
    /// Secondary CDR bucket for full reprocessing, empty for none.
    pub additional_cdrs_bucket_name: String,
    /// Custom query template.
    pub athena_query: String,
    /// Custom query schedule expression.
    pub cron_setting: String,
    /// Notification address, empty for none.
    pub email: String,
    /// Resource namespace; generated when absent.
    pub namespace: Option<String>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            region: None,
            log_level: Some("INFO".to_string()),
            removal_policy: Some("DESTROY".to_string()),
            projection_year_min: "2023".to_string(),
            projection_year_max: "2026".to_string(),
            buffer_hint_size: "128".to_string(),
            buffer_hint_interval: "300".to_string(),
            raw_cdrs_bucket_name: String::new(),
            additional_cdrs_bucket_name: String::new(),
            athena_query: DEFAULT_ATHENA_QUERY.to_string(),
            cron_setting: DEFAULT_QUERY_CRON.to_string(),
            email: String::new(),
            namespace: None,
        }
    }
}

impl RawConfig {
    /// Reads the configuration from a key lookup, applying defaults.
    ///
    /// Empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            region: get("AWS_REGION").or_else(|| get("CDK_DEFAULT_REGION")),
            log_level: get("LOG_LEVEL").or(defaults.log_level),
            removal_policy: get("REMOVAL_POLICY").or(defaults.removal_policy),
            projection_year_min: get("PROJECTION_YEAR_MIN").unwrap_or(defaults.projection_year_min),
            projection_year_max: get("PROJECTION_YEAR_MAX").unwrap_or(defaults.projection_year_max),
            buffer_hint_size: get("BUFFER_HINT_SIZE").unwrap_or(defaults.buffer_hint_size),
            buffer_hint_interval: get("BUFFER_HINT_INTERVAL")
                .unwrap_or(defaults.buffer_hint_interval),
            raw_cdrs_bucket_name: get("RAW_CDRS_BUCKET").unwrap_or_default(),
            additional_cdrs_bucket_name: get("ADDITIONAL_CDRS_BUCKET").unwrap_or_default(),
            athena_query: get("ATHENA_QUERY").unwrap_or(defaults.athena_query),
            cron_setting: get("CRON").unwrap_or(defaults.cron_setting),
            email: get("EMAIL").unwrap_or_default(),
            namespace: get("NAMESPACE"),
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "No .env file loaded");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Validates against the current calendar year.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate(self, crate::utils::current_year())
    }

    /// Validates and converts into the immutable typed configuration.
    pub fn into_config(self, current_year: i32) -> Result<Config, ConfigurationError> {
        let mut violations = validate(&self, current_year)
            .err()
            .map(|e| e.violations)
            .unwrap_or_default();

        if self.athena_query.trim().is_empty() {
            violations.push(ConfigViolation::new(
                "athenaQuery",
                "ATHENA_QUERY must not be empty",
            ));
        }

        let query_schedule = Schedule::parse(&self.cron_setting)
            .map_err(|e| violations.push(ConfigViolation::new("cronSetting", e.to_string())))
            .ok();

        let namespace = match self.namespace.as_deref() {
            Some(value) => Namespace::new(value)
                .map_err(|e| violations.push(ConfigViolation::new("namespace", e.to_string())))
                .ok(),
            None => Some(Namespace::generate()),
        };

        let (Some(query_schedule), Some(namespace), true) =
            (query_schedule, namespace, violations.is_empty())
        else {
            return Err(ConfigurationError::new(violations));
        };

        // Every field below was checked by `validate`.
        let parse_year = |v: &str| validator::parse_projection_year(v).unwrap_or(current_year);
        let parse_u32 = |v: &str| v.trim().parse::<u32>().unwrap_or_default();

        let resources = ResourceNames::new(&namespace);
        Ok(Config {
            region: self.region.as_deref().and_then(|r| r.parse().ok()),
            log_level: self
                .log_level
                .as_deref()
                .and_then(|l| l.parse().ok())
                .unwrap_or_default(),
            removal_policy: self
                .removal_policy
                .as_deref()
                .and_then(|p| p.parse().ok())
                .unwrap_or_default(),
            projection_years: parse_year(&self.projection_year_min)
                ..=parse_year(&self.projection_year_max),
            buffer_hint_size: parse_u32(&self.buffer_hint_size),
            buffer_hint_interval: parse_u32(&self.buffer_hint_interval),
            raw_cdrs_bucket: Some(self.raw_cdrs_bucket_name).filter(|b| !b.is_empty()),
            additional_cdrs_bucket: Some(self.additional_cdrs_bucket_name)
                .filter(|b| !b.is_empty()),
            athena_query: self.athena_query,
            query_schedule,
            email: Some(self.email).filter(|e| !e.is_empty()),
            namespace,
            resources,
        })
    }
}
