//! Stage status and kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of external job a stage drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// A catalog crawl over stored records.
    Crawl,
    /// A batch transform job over raw records.
    Transform,
    /// An analytical query over processed records.
    Query,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crawl => write!(f, "crawl"),
            Self::Transform => write!(f, "transform"),
            Self::Query => write!(f, "query"),
        }
    }
}

/// The status a checker reports for a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The remote job is still running.
    InProgress,
    /// The remote job finished successfully.
    Complete,
    /// The remote job failed.
    Failed,
}

impl Default for StageStatus {
    fn default() -> Self {
        Self::InProgress
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status ends polling for the stage.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}
