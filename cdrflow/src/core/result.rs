//! Stage result type with factory methods.

use super::StageStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The outcome of one start or check call for a stage.
///
/// `failure` always wins over `complete`: a result with both set is a
/// failure. Stage-specific identifiers (a job run id, a query execution id)
/// live in `metadata` so the next call for the same stage can find them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// The remote job finished.
    pub complete: bool,

    /// The remote job failed.
    pub failure: bool,

    /// Failure text for the notifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Stage-specific identifying data.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl StageResult {
    /// Result of an action-start call: neither complete nor failed.
    #[must_use]
    pub fn started() -> Self {
        Self::default()
    }

    /// The remote job is still running.
    #[must_use]
    pub fn in_progress() -> Self {
        Self::default()
    }

    /// The remote job finished successfully.
    #[must_use]
    pub fn complete() -> Self {
        Self {
            complete: true,
            ..Self::default()
        }
    }

    /// The remote job failed.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            failure: true,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Gets a metadata value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Gets a metadata value as a string.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(serde_json::Value::as_str)
    }

    /// Copies metadata entries from `previous` that this result lacks.
    pub fn inherit_metadata(&mut self, previous: &Self) {
        for (key, value) in &previous.metadata {
            self.metadata
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Classifies the result, checking failure first.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        if self.failure {
            StageStatus::Failed
        } else if self.complete {
            StageStatus::Complete
        } else {
            StageStatus::InProgress
        }
    }

    /// Returns true if the result is a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status().is_failure()
    }

    /// Returns true if the result is a success.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status().is_success()
    }

    /// Converts the result to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("status".to_string(), serde_json::json!(self.status().to_string()));
        map.insert("complete".to_string(), serde_json::json!(self.complete));
        map.insert("failure".to_string(), serde_json::json!(self.failure));

        if let Some(ref error) = self.error_message {
            map.insert("error_message".to_string(), serde_json::json!(error));
        }
        if !self.metadata.is_empty() {
            map.insert(
                "metadata".to_string(),
                serde_json::Value::Object(self.metadata.clone()),
            );
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_factories() {
        assert_eq!(StageResult::started().status(), StageStatus::InProgress);
        assert_eq!(StageResult::in_progress().status(), StageStatus::InProgress);
        assert_eq!(StageResult::complete().status(), StageStatus::Complete);

        let failed = StageResult::failed("crawler exploded");
        assert_eq!(failed.status(), StageStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("crawler exploded"));
    }

    #[test]
    fn test_failure_wins_over_complete() {
        let result = StageResult {
            complete: true,
            failure: true,
            ..StageResult::default()
        };
        assert_eq!(result.status(), StageStatus::Failed);
        assert!(result.is_failure());
        assert!(!result.is_complete());
    }

    #[test]
    fn test_inherit_metadata_keeps_newer_values() {
        let previous = StageResult::started()
            .with_metadata("runId", json!("jr_1"))
            .with_metadata("attempt", json!(1));
        let mut current = StageResult::in_progress().with_metadata("attempt", json!(2));

        current.inherit_metadata(&previous);

        assert_eq!(current.metadata_str("runId"), Some("jr_1"));
        assert_eq!(current.get("attempt"), Some(&json!(2)));
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let json = serde_json::to_value(StageResult::complete()).unwrap();
        assert_eq!(json, json!({"complete": true, "failure": false}));
    }

    #[test]
    fn test_to_dict() {
        let dict = StageResult::failed("bad").to_dict();
        assert_eq!(dict.get("status").unwrap(), "failed");
        assert_eq!(dict.get("error_message").unwrap(), "bad");
        assert!(dict.get("metadata").is_none());
    }
}
