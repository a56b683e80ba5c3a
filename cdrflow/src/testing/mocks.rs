//! Scripted stage actions and notifiers.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::core::{StageResult, WorkflowPayload};
use crate::errors::CollaboratorError;
use crate::notify::{Notification, Notifier};
use crate::stages::StageAction;

type Scripted = Result<StageResult, CollaboratorError>;

/// A stage action that replays scripted results.
///
/// Check results are consumed in order; the last one repeats once the
/// script runs out. Every call is counted and the payload seen by each
/// check is kept.
#[derive(Debug)]
pub struct ScriptedAction {
    start: Mutex<Scripted>,
    checks: Mutex<VecDeque<Scripted>>,
    last_check: Mutex<Scripted>,
    start_calls: Mutex<usize>,
    check_calls: Mutex<usize>,
    seen: Mutex<Vec<WorkflowPayload>>,
}

impl ScriptedAction {
    /// Creates an action whose checks return `checks` in order.
    #[must_use]
    pub fn new(checks: Vec<Scripted>) -> Self {
        Self {
            start: Mutex::new(Ok(StageResult::started())),
            checks: Mutex::new(checks.into()),
            last_check: Mutex::new(Ok(StageResult::complete())),
            start_calls: Mutex::new(0),
            check_calls: Mutex::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Completes on the first check.
    #[must_use]
    pub fn always_complete() -> Self {
        Self::new(vec![Ok(StageResult::complete())])
    }

    /// Reports in progress `n` times, then complete.
    #[must_use]
    pub fn complete_after(n: usize) -> Self {
        let mut checks: Vec<Scripted> = (0..n).map(|_| Ok(StageResult::in_progress())).collect();
        checks.push(Ok(StageResult::complete()));
        Self::new(checks)
    }

    /// Fails on the first check.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(vec![Ok(StageResult::failed(message))])
    }

    /// Never completes.
    #[must_use]
    pub fn never_complete() -> Self {
        Self::new(vec![Ok(StageResult::in_progress())])
    }

    /// Sets what the start call returns.
    #[must_use]
    pub fn with_start(self, result: Scripted) -> Self {
        *self.start.lock() = result;
        self
    }

    /// Number of start calls made.
    #[must_use]
    pub fn start_calls(&self) -> usize {
        *self.start_calls.lock()
    }

    /// Number of check calls made.
    #[must_use]
    pub fn check_calls(&self) -> usize {
        *self.check_calls.lock()
    }

    /// Payloads passed to each check call, in order.
    #[must_use]
    pub fn seen_payloads(&self) -> Vec<WorkflowPayload> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl StageAction for ScriptedAction {
    async fn start(&self, _payload: &WorkflowPayload) -> Result<StageResult, CollaboratorError> {
        *self.start_calls.lock() += 1;
        self.start.lock().clone()
    }

    async fn check(&self, payload: &WorkflowPayload) -> Result<StageResult, CollaboratorError> {
        *self.check_calls.lock() += 1;
        self.seen.lock().push(payload.clone());

        let mut checks = self.checks.lock();
        match checks.pop_front() {
            Some(next) => {
                if checks.is_empty() {
                    *self.last_check.lock() = next.clone();
                }
                next
            }
            None => self.last_check.lock().clone(),
        }
    }
}

/// A notifier that records every payload it is given.
#[derive(Debug)]
pub struct RecordingNotifier {
    payloads: Mutex<Vec<WorkflowPayload>>,
    error: Option<CollaboratorError>,
}

impl RecordingNotifier {
    /// Creates a notifier that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            error: None,
        }
    }

    /// Creates a notifier that records, then fails with `error`.
    #[must_use]
    pub fn failing(error: CollaboratorError) -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            error: Some(error),
        }
    }

    /// Number of notify calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.payloads.lock().len()
    }

    /// Payloads received, in order.
    #[must_use]
    pub fn payloads(&self) -> Vec<WorkflowPayload> {
        self.payloads.lock().clone()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, payload: &WorkflowPayload) -> Result<Notification, CollaboratorError> {
        self.payloads.lock().push(payload.clone());
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        Ok(match payload.error_message() {
            Some(error) => Notification::failure(&error),
            None => Notification::new("recorded", "ok"),
        })
    }
}
