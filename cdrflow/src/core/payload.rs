//! The accumulated payload of one workflow run.

use super::StageResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Everything a workflow run has accumulated so far.
///
/// `input` is the correlation payload the run was triggered with; it is
/// passed through to the notifier untouched. `results` holds the latest
/// result of every stage that has started, keyed by status key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowPayload {
    /// The workflow instance this payload belongs to.
    pub run_id: Uuid,

    /// Opaque trigger input.
    #[serde(default)]
    pub input: serde_json::Value,

    /// Latest result per stage key.
    #[serde(default)]
    pub results: BTreeMap<String, StageResult>,
}

impl WorkflowPayload {
    /// Creates a payload for a fresh run.
    #[must_use]
    pub fn new(run_id: Uuid, input: serde_json::Value) -> Self {
        Self {
            run_id,
            input,
            results: BTreeMap::new(),
        }
    }

    /// Records the latest result for a stage, replacing any earlier one.
    pub fn record(&mut self, key: impl Into<String>, result: StageResult) {
        self.results.insert(key.into(), result);
    }

    /// Returns the latest result for a stage.
    #[must_use]
    pub fn result(&self, key: &str) -> Option<&StageResult> {
        self.results.get(key)
    }

    /// Returns true if a stage has a recorded result.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.results.contains_key(key)
    }

    /// Returns the failed stage, if any.
    #[must_use]
    pub fn failure(&self) -> Option<(&str, &StageResult)> {
        self.results
            .iter()
            .find(|(_, result)| result.is_failure())
            .map(|(key, result)| (key.as_str(), result))
    }

    /// Returns the failure text, falling back to the failed stage key.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.failure().map(|(key, result)| {
            result
                .error_message
                .clone()
                .unwrap_or_else(|| format!("Stage {key} failed"))
        })
    }

    /// Returns true if no stage failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure().is_none()
    }

    /// Reads a string field from the trigger input.
    #[must_use]
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(serde_json::Value::as_str)
    }
}
