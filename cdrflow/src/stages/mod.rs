//! Stage action trait and polling stage definitions.
//!
//! A stage is one `{start, poll-until-done}` unit. The workflow engine knows
//! nothing about crawlers or jobs; it only calls the [`StageAction`] bound
//! to each [`PollingStage`].

mod polling;

pub use polling::PollingStage;

use crate::core::{StageResult, WorkflowPayload};
use crate::errors::CollaboratorError;
use async_trait::async_trait;
use std::fmt::Debug;

/// The boundary contract of one stage's action invoker and status checker.
///
/// Implementations must tolerate repeated `start` calls for work that is
/// already running; the workflow does not deduplicate them.
#[async_trait]
pub trait StageAction: Send + Sync + Debug {
    /// Starts the remote work.
    ///
    /// The returned result is recorded under the stage key; its metadata is
    /// visible to later `check` calls.
    async fn start(&self, payload: &WorkflowPayload) -> Result<StageResult, CollaboratorError>;

    /// Reports the remote work's current status.
    async fn check(&self, payload: &WorkflowPayload) -> Result<StageResult, CollaboratorError>;
}

/// A stage action built from two closures.
pub struct FnAction<S, C>
where
    S: Fn(&WorkflowPayload) -> Result<StageResult, CollaboratorError> + Send + Sync,
    C: Fn(&WorkflowPayload) -> Result<StageResult, CollaboratorError> + Send + Sync,
{
    name: String,
    start: S,
    check: C,
}

impl<S, C> FnAction<S, C>
where
    S: Fn(&WorkflowPayload) -> Result<StageResult, CollaboratorError> + Send + Sync,
    C: Fn(&WorkflowPayload) -> Result<StageResult, CollaboratorError> + Send + Sync,
{
    /// Creates a new closure-based action.
    pub fn new(name: impl Into<String>, start: S, check: C) -> Self {
        Self {
            name: name.into(),
            start,
            check,
        }
    }
}

impl<S, C> Debug for FnAction<S, C>
where
    S: Fn(&WorkflowPayload) -> Result<StageResult, CollaboratorError> + Send + Sync,
    C: Fn(&WorkflowPayload) -> Result<StageResult, CollaboratorError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnAction")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<S, C> StageAction for FnAction<S, C>
where
    S: Fn(&WorkflowPayload) -> Result<StageResult, CollaboratorError> + Send + Sync,
    C: Fn(&WorkflowPayload) -> Result<StageResult, CollaboratorError> + Send + Sync,
{
    async fn start(&self, payload: &WorkflowPayload) -> Result<StageResult, CollaboratorError> {
        (self.start)(payload)
    }

    async fn check(&self, payload: &WorkflowPayload) -> Result<StageResult, CollaboratorError> {
        (self.check)(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_fn_action() {
        let action = FnAction::new(
            "echo",
            |_payload| Ok(StageResult::started().with_metadata("id", json!("x"))),
            |payload| {
                if payload.input_str("fail").is_some() {
                    Ok(StageResult::failed("asked to fail"))
                } else {
                    Ok(StageResult::complete())
                }
            },
        );

        let payload = WorkflowPayload::new(Uuid::new_v4(), json!({}));
        let started = action.start(&payload).await.unwrap();
        assert_eq!(started.metadata_str("id"), Some("x"));
        assert!(action.check(&payload).await.unwrap().is_complete());

        let failing = WorkflowPayload::new(Uuid::new_v4(), json!({"fail": "yes"}));
        assert!(action.check(&failing).await.unwrap().is_failure());
        assert!(format!("{action:?}").contains("echo"));
    }
}
