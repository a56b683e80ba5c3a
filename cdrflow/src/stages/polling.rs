//! Polling stage definition.

use super::StageAction;
use crate::core::StageKind;
use crate::errors::WorkflowBuildError;
use std::sync::Arc;
use std::time::Duration;

/// One `{status key, action, wait}` tuple of a polling workflow.
#[derive(Debug, Clone)]
pub struct PollingStage {
    /// Key the stage's results are recorded under (e.g. `"Crawl"`).
    pub key: String,
    /// The action invoker and status checker.
    pub action: Arc<dyn StageAction>,
    /// Suspension between a start or retry and the next status check.
    pub wait: Duration,
    /// What kind of job the stage drives.
    pub kind: StageKind,
}

impl PollingStage {
    /// Creates a new polling stage.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        kind: StageKind,
        action: Arc<dyn StageAction>,
        wait: Duration,
    ) -> Self {
        Self {
            key: key.into(),
            action,
            wait,
            kind,
        }
    }

    /// Validates the stage within the named workflow.
    pub fn validate(&self, workflow: &str) -> Result<(), WorkflowBuildError> {
        if self.key.trim().is_empty() {
            return Err(WorkflowBuildError::EmptyStageKey {
                workflow: workflow.to_string(),
            });
        }
        if self.wait.is_zero() {
            return Err(WorkflowBuildError::ZeroWait {
                workflow: workflow.to_string(),
                key: self.key.clone(),
            });
        }
        Ok(())
    }
}
