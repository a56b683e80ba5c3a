//! Workflow run reports.

use super::WorkflowInstance;
use crate::notify::Notification;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// How a workflow run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WorkflowOutcome {
    /// Every stage completed and the notifier was invoked.
    Succeeded,
    /// A stage failed; later stages never started.
    Failed {
        /// Key of the failed stage.
        stage: String,
    },
    /// The overall timeout elapsed before the run reached a terminal state.
    TimedOut,
}

impl WorkflowOutcome {
    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Per-stage bookkeeping gathered while driving a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Stage keys in the order their start call was made.
    pub stages_started: Vec<String>,
    /// Status checks made per stage.
    pub checks: BTreeMap<String, u32>,
    /// Branch-to-wait loops per stage.
    pub retries: BTreeMap<String, u32>,
}

impl RunStats {
    pub(crate) fn record_start(&mut self, key: &str) {
        self.stages_started.push(key.to_string());
    }

    pub(crate) fn record_check(&mut self, key: &str) {
        *self.checks.entry(key.to_string()).or_default() += 1;
    }

    pub(crate) fn record_retry(&mut self, key: &str) {
        *self.retries.entry(key.to_string()).or_default() += 1;
    }
}

/// Report of one finished workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// The instance in its final state.
    pub instance: WorkflowInstance,
    /// How the run ended.
    pub outcome: WorkflowOutcome,
    /// Per-stage bookkeeping.
    pub stats: RunStats,
    /// The notification sent, if the notifier succeeded.
    pub notification: Option<Notification>,
    /// The notifier's error, if it failed.
    pub notification_error: Option<String>,
    /// Wall-clock time of the run.
    pub duration: Duration,
}

impl WorkflowRun {
    /// Stage keys in the order they started.
    #[must_use]
    pub fn stages_started(&self) -> &[String] {
        &self.stats.stages_started
    }

    /// Status checks made for a stage.
    #[must_use]
    pub fn checks(&self, key: &str) -> u32 {
        self.stats.checks.get(key).copied().unwrap_or(0)
    }

    /// Retry cycles made for a stage.
    #[must_use]
    pub fn retries(&self, key: &str) -> u32 {
        self.stats.retries.get(key).copied().unwrap_or(0)
    }

    /// Returns true if the notifier was invoked, successfully or not.
    #[must_use]
    pub fn notified(&self) -> bool {
        self.notification.is_some() || self.notification_error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_stats_counters() {
        let mut stats = RunStats::default();
        stats.record_start("Crawl");
        stats.record_check("Crawl");
        stats.record_check("Crawl");
        stats.record_retry("Crawl");

        assert_eq!(stats.stages_started, vec!["Crawl".to_string()]);
        assert_eq!(stats.checks.get("Crawl"), Some(&2));
        assert_eq!(stats.retries.get("Crawl"), Some(&1));
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(WorkflowOutcome::Failed {
            stage: "ETL".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "failed", "stage": "ETL"}));
        assert!(WorkflowOutcome::Succeeded.is_success());
        assert!(!WorkflowOutcome::TimedOut.is_success());
    }
}
