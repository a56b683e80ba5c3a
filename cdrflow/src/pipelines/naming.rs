//! Namespaces and the resource names derived from them.

use crate::errors::NamespaceError;
use crate::utils::generate_suffix;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Table the raw record stream lands in.
pub const RAW_TABLE: &str = "amazon_chime_voice_connector_cdrs";

/// Table the transform job writes.
pub const PROCESSED_TABLE: &str = "processed_cdrs";

fn namespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]{3,32}$").expect("namespace pattern is a valid regex")
    })
}

/// Unique suffix threaded into every resource name of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Validates a caller-supplied namespace.
    pub fn new(value: &str) -> Result<Self, NamespaceError> {
        if namespace_pattern().is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(NamespaceError {
                value: value.to_string(),
            })
        }
    }

    /// Generates a fresh random namespace.
    #[must_use]
    pub fn generate() -> Self {
        Self(generate_suffix())
    }

    /// The namespace text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Namespace {
    type Error = NamespaceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Names of the shared storage and catalog resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNames {
    /// Catalog database.
    pub database: String,
    /// Raw records table.
    pub raw_table: String,
    /// Processed records table.
    pub processed_table: String,
    /// Bucket created for raw records when no existing one is configured.
    pub raw_bucket: String,
    /// Bucket the transform job writes.
    pub processed_bucket: String,
    /// Bucket query results are written to.
    pub results_bucket: String,
    /// Notification topic.
    pub topic: String,
}

impl ResourceNames {
    /// Derives every name from the namespace.
    #[must_use]
    pub fn new(ns: &Namespace) -> Self {
        Self {
            database: format!("cdrs_{ns}"),
            raw_table: RAW_TABLE.to_string(),
            processed_table: PROCESSED_TABLE.to_string(),
            raw_bucket: format!("cdr-raw-{ns}"),
            processed_bucket: format!("cdr-processed-{ns}"),
            results_bucket: format!("cdr-results-{ns}"),
            topic: format!("cdr-notifications-{ns}"),
        }
    }
}

/// The crawlers and job a pipeline drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDescriptor {
    /// Crawler over raw records.
    pub raw_crawler: String,
    /// Crawler over processed records.
    pub processed_crawler: String,
    /// Transform job.
    pub etl_job: String,
    /// Bucket the raw crawler reads.
    pub source_bucket: String,
}

impl PipelineDescriptor {
    /// The daily pipeline's resources.
    #[must_use]
    pub fn daily(ns: &Namespace, source_bucket: impl Into<String>) -> Self {
        Self {
            raw_crawler: format!("dailyRawCdr_{ns}"),
            processed_crawler: format!("dailyProcessedCdr_{ns}"),
            etl_job: format!("cdrDailyETL{ns}"),
            source_bucket: source_bucket.into(),
        }
    }

    /// The full reprocessing pipeline's resources.
    #[must_use]
    pub fn full(ns: &Namespace, source_bucket: impl Into<String>) -> Self {
        Self {
            raw_crawler: format!("fullRawCdr_{ns}"),
            processed_crawler: format!("fullProcessedCdr_{ns}"),
            etl_job: format!("cdrFullETL{ns}"),
            source_bucket: source_bucket.into(),
        }
    }
}
