//! Typed deployment settings.

use crate::pipelines::{Namespace, ResourceNames, Schedule};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Regions the pipeline can be deployed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    /// us-east-1
    #[serde(rename = "us-east-1")]
    UsEast1,
    /// us-west-2
    #[serde(rename = "us-west-2")]
    UsWest2,
    /// ca-central-1
    #[serde(rename = "ca-central-1")]
    CaCentral1,
    /// eu-west-1
    #[serde(rename = "eu-west-1")]
    EuWest1,
    /// eu-central-1
    #[serde(rename = "eu-central-1")]
    EuCentral1,
    /// eu-west-2
    #[serde(rename = "eu-west-2")]
    EuWest2,
    /// ap-southeast-1
    #[serde(rename = "ap-southeast-1")]
    ApSoutheast1,
    /// ap-northeast-1
    #[serde(rename = "ap-northeast-1")]
    ApNortheast1,
    /// ap-southeast-2
    #[serde(rename = "ap-southeast-2")]
    ApSoutheast2,
    /// ap-northeast-2
    #[serde(rename = "ap-northeast-2")]
    ApNortheast2,
}

impl Region {
    /// Every supported region, in display order.
    pub const ALL: [Self; 10] = [
        Self::UsEast1,
        Self::UsWest2,
        Self::CaCentral1,
        Self::EuWest1,
        Self::EuCentral1,
        Self::EuWest2,
        Self::ApSoutheast1,
        Self::ApNortheast1,
        Self::ApSoutheast2,
        Self::ApNortheast2,
    ];

    /// Returns the region code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsEast1 => "us-east-1",
            Self::UsWest2 => "us-west-2",
            Self::CaCentral1 => "ca-central-1",
            Self::EuWest1 => "eu-west-1",
            Self::EuCentral1 => "eu-central-1",
            Self::EuWest2 => "eu-west-2",
            Self::ApSoutheast1 => "ap-southeast-1",
            Self::ApNortheast1 => "ap-northeast-1",
            Self::ApSoutheast2 => "ap-southeast-2",
            Self::ApNortheast2 => "ap-northeast-2",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = ();

    // Region codes are matched exactly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|r| r.as_str() == s).ok_or(())
    }
}

/// Log verbosity for the pipeline's functions and for local tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Informational output.
    #[default]
    Info,
    /// Everything.
    Debug,
}

impl LogLevel {
    /// Returns the level as a `tracing` filter directive.
    #[must_use]
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_filter().to_uppercase())
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            _ => Err(()),
        }
    }
}

/// What happens to stored data when the deployment is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RemovalPolicy {
    /// Delete the data.
    #[default]
    Destroy,
    /// Keep the data.
    Retain,
    /// Snapshot, then delete.
    Snapshot,
}

impl fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Destroy => write!(f, "DESTROY"),
            Self::Retain => write!(f, "RETAIN"),
            Self::Snapshot => write!(f, "SNAPSHOT"),
        }
    }
}

impl FromStr for RemovalPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "destroy" => Ok(Self::Destroy),
            "retain" => Ok(Self::Retain),
            "snapshot" => Ok(Self::Snapshot),
            _ => Err(()),
        }
    }
}

/// Validated, immutable deployment configuration.
///
/// Built once at startup by [`RawConfig::into_config`](super::RawConfig::into_config)
/// and passed by reference to everything that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Target region, if one was given.
    pub region: Option<Region>,
    /// Log verbosity.
    pub log_level: LogLevel,
    /// Data removal policy.
    pub removal_policy: RemovalPolicy,
    /// Years covered by partition projection on the processed table.
    pub projection_years: RangeInclusive<i32>,
    /// Stream delivery buffer size hint, in MiB.
    pub buffer_hint_size: u32,
    /// Stream delivery buffer interval hint, in seconds.
    pub buffer_hint_interval: u32,
    /// Existing raw CDR bucket; `None` means one is created.
    pub raw_cdrs_bucket: Option<String>,
    /// Secondary CDR bucket for full reprocessing.
    pub additional_cdrs_bucket: Option<String>,
    /// Custom query template with `{database}` and `{table}` placeholders.
    pub athena_query: String,
    /// Schedule of the custom query report.
    pub query_schedule: Schedule,
    /// Address subscribed to result notifications.
    pub email: Option<String>,
    /// Unique namespace threaded into every resource name.
    pub namespace: Namespace,
    /// Resource names derived from the namespace.
    pub resources: ResourceNames,
}
