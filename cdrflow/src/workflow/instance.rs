//! Workflow instances and their state pointer.

use crate::core::WorkflowPayload;
use crate::utils::{generate_uuid, now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Where a workflow instance currently is.
///
/// Stage-scoped states carry the index of the stage in the workflow's
/// ordered stage list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum WorkflowState {
    /// Invoke the stage's action-start call.
    Start(usize),
    /// Suspend for the stage's wait duration.
    Wait(usize),
    /// Invoke the stage's status-check call.
    Check(usize),
    /// Decide between retry, advance and abort.
    Branch(usize),
    /// Send the terminal notification.
    Notify,
    /// Nothing left to do.
    Done,
}

impl WorkflowState {
    /// Returns the stage index for stage-scoped states.
    #[must_use]
    pub fn stage(&self) -> Option<usize> {
        match self {
            Self::Start(i) | Self::Wait(i) | Self::Check(i) | Self::Branch(i) => Some(*i),
            Self::Notify | Self::Done => None,
        }
    }

    /// Returns true once the instance can make no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start(i) => write!(f, "start[{i}]"),
            Self::Wait(i) => write!(f, "wait[{i}]"),
            Self::Check(i) => write!(f, "check[{i}]"),
            Self::Branch(i) => write!(f, "branch[{i}]"),
            Self::Notify => write!(f, "notify"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// One run of a polling workflow.
///
/// Owned by exactly one run; created when the workflow is triggered and
/// handed back inside the run report when it ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Unique id of this run.
    pub id: Uuid,
    /// Name of the workflow that owns the run.
    pub workflow: String,
    /// When the run was triggered.
    pub started_at: Timestamp,
    /// Accumulated payload.
    pub payload: WorkflowPayload,
    /// Current state pointer.
    pub state: WorkflowState,
    /// Every state entered, in order, starting with the initial one.
    pub history: Vec<WorkflowState>,
}

impl WorkflowInstance {
    /// Creates a fresh instance positioned at the first stage's start.
    #[must_use]
    pub fn new(workflow: impl Into<String>, input: serde_json::Value) -> Self {
        let id = generate_uuid();
        let initial = WorkflowState::Start(0);
        Self {
            id,
            workflow: workflow.into(),
            started_at: now_utc(),
            payload: WorkflowPayload::new(id, input),
            state: initial,
            history: vec![initial],
        }
    }

    /// Moves the state pointer.
    pub fn advance(&mut self, next: WorkflowState) {
        self.state = next;
        self.history.push(next);
    }

    /// Counts how often a state was entered.
    #[must_use]
    pub fn visits(&self, state: WorkflowState) -> usize {
        self.history.iter().filter(|s| **s == state).count()
    }
}
