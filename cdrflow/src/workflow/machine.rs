//! The polling workflow state machine.

use super::{RunStats, WorkflowInstance, WorkflowOutcome, WorkflowRun, WorkflowState};
use crate::core::{StageResult, StageStatus};
use crate::errors::CollaboratorError;
use crate::events::EventSink;
use crate::notify::{Notification, Notifier};
use crate::observability::WideEventEmitter;
use crate::stages::PollingStage;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// A validated polling workflow definition.
///
/// The definition is immutable and shared read-only between any number of
/// concurrent runs; each run owns its own [`WorkflowInstance`].
#[derive(Debug, Clone)]
pub struct PollingWorkflow {
    pub(super) name: String,
    pub(super) stages: Vec<PollingStage>,
    pub(super) notifier: Arc<dyn Notifier>,
    pub(super) timeout: Duration,
    pub(super) event_sink: Arc<dyn EventSink>,
}

type Delivery = Option<Result<Notification, CollaboratorError>>;

impl PollingWorkflow {
    /// The workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered stages.
    #[must_use]
    pub fn stages(&self) -> &[PollingStage] {
        &self.stages
    }

    /// The ordered status keys.
    #[must_use]
    pub fn stage_keys(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.key.as_str()).collect()
    }

    /// The whole-workflow timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs a fresh instance to completion, failure or timeout.
    ///
    /// Never returns an error: collaborator errors become stage failures
    /// and the outcome is reported in the returned [`WorkflowRun`].
    pub async fn run(&self, input: serde_json::Value) -> WorkflowRun {
        let instance = WorkflowInstance::new(&self.name, input);
        let span = info_span!("workflow", workflow = %self.name, run_id = %instance.id);
        self.execute(instance).instrument(span).await
    }

    async fn execute(&self, mut instance: WorkflowInstance) -> WorkflowRun {
        let started = Instant::now();
        let mut stats = RunStats::default();
        let mut delivery: Delivery = None;

        info!(stages = self.stages.len(), timeout_secs = self.timeout.as_secs(), "Workflow started");
        self.emit(instance.id, "workflow.started", json!({"stages": self.stage_keys()}));

        let finished = tokio::time::timeout(
            self.timeout,
            self.drive(&mut instance, &mut stats, &mut delivery),
        )
        .await
        .is_ok();

        let outcome = if !finished {
            warn!(state = %instance.state, "Workflow timed out");
            self.emit(
                instance.id,
                "workflow.timed_out",
                json!({"state": instance.state}),
            );
            WorkflowOutcome::TimedOut
        } else if let Some((key, _)) = instance.payload.failure() {
            WorkflowOutcome::Failed {
                stage: key.to_string(),
            }
        } else {
            WorkflowOutcome::Succeeded
        };

        let duration = started.elapsed();
        if finished {
            info!(outcome = ?outcome, duration_ms = duration.as_millis() as u64, "Workflow finished");
            self.emit(instance.id, "workflow.completed", json!({"outcome": outcome}));
        }

        let (notification, notification_error) = match delivery {
            Some(Ok(n)) => (Some(n), None),
            Some(Err(e)) => (None, Some(e.to_string())),
            None => (None, None),
        };

        let run = WorkflowRun {
            instance,
            outcome,
            stats,
            notification,
            notification_error,
            duration,
        };
        WideEventEmitter::new().emit_run_event(self.event_sink.as_ref(), &run);
        run
    }

    async fn drive(
        &self,
        instance: &mut WorkflowInstance,
        stats: &mut RunStats,
        delivery: &mut Delivery,
    ) {
        while !instance.state.is_terminal() {
            let next = self.step(instance, stats, delivery).await;
            debug!(from = %instance.state, to = %next, "Transition");
            instance.advance(next);
        }
    }

    async fn step(
        &self,
        instance: &mut WorkflowInstance,
        stats: &mut RunStats,
        delivery: &mut Delivery,
    ) -> WorkflowState {
        match instance.state {
            WorkflowState::Start(i) => {
                let stage = &self.stages[i];
                stats.record_start(&stage.key);
                info!(stage = %stage.key, kind = %stage.kind, "Starting stage");
                self.emit(
                    instance.id,
                    "stage.started",
                    json!({"stage": stage.key, "kind": stage.kind}),
                );

                let result = stage
                    .action
                    .start(&instance.payload)
                    .await
                    .unwrap_or_else(|e| collaborator_failure(&stage.key, &e));
                instance.payload.record(stage.key.clone(), result);
                WorkflowState::Wait(i)
            }

            WorkflowState::Wait(i) => {
                let stage = &self.stages[i];
                debug!(stage = %stage.key, wait_ms = stage.wait.as_millis() as u64, "Waiting");
                tokio::time::sleep(stage.wait).await;
                WorkflowState::Check(i)
            }

            WorkflowState::Check(i) => {
                let stage = &self.stages[i];
                let previous = instance.payload.result(&stage.key).cloned();

                // A start that already failed has nothing to poll.
                if previous.as_ref().is_some_and(StageResult::is_failure) {
                    return WorkflowState::Branch(i);
                }

                stats.record_check(&stage.key);
                let mut result = stage
                    .action
                    .check(&instance.payload)
                    .await
                    .unwrap_or_else(|e| collaborator_failure(&stage.key, &e));
                if let Some(previous) = &previous {
                    result.inherit_metadata(previous);
                }

                debug!(stage = %stage.key, status = %result.status(), "Polled stage");
                self.emit(
                    instance.id,
                    "stage.polled",
                    json!({"stage": stage.key, "status": result.status()}),
                );
                instance.payload.record(stage.key.clone(), result);
                WorkflowState::Branch(i)
            }

            WorkflowState::Branch(i) => {
                let stage = &self.stages[i];
                let result = instance.payload.result(&stage.key);
                match result.map_or(StageStatus::InProgress, StageResult::status) {
                    StageStatus::Failed => {
                        let error = result.and_then(|r| r.error_message.clone());
                        warn!(stage = %stage.key, error = ?error, "Stage failed");
                        self.emit(
                            instance.id,
                            "stage.failed",
                            json!({"stage": stage.key, "error": error}),
                        );
                        WorkflowState::Notify
                    }
                    StageStatus::InProgress => {
                        stats.record_retry(&stage.key);
                        let retry = stats.retries.get(&stage.key).copied().unwrap_or_default();
                        debug!(stage = %stage.key, retry, "Stage not complete, retrying");
                        self.emit(
                            instance.id,
                            "stage.retry",
                            json!({"stage": stage.key, "retry": retry}),
                        );
                        WorkflowState::Wait(i)
                    }
                    StageStatus::Complete => {
                        info!(stage = %stage.key, "Stage complete");
                        self.emit(instance.id, "stage.completed", json!({"stage": stage.key}));
                        if i + 1 < self.stages.len() {
                            WorkflowState::Start(i + 1)
                        } else {
                            WorkflowState::Notify
                        }
                    }
                }
            }

            WorkflowState::Notify => {
                match self.notifier.notify(&instance.payload).await {
                    Ok(notification) => {
                        info!(subject = %notification.subject, "Notification sent");
                        self.emit(
                            instance.id,
                            "workflow.notified",
                            json!({"subject": notification.subject}),
                        );
                        *delivery = Some(Ok(notification));
                    }
                    Err(e) => {
                        error!(error = %e, "Notifier failed");
                        self.emit(
                            instance.id,
                            "workflow.notify_failed",
                            json!({"error": e.to_string()}),
                        );
                        *delivery = Some(Err(e));
                    }
                }
                WorkflowState::Done
            }

            WorkflowState::Done => WorkflowState::Done,
        }
    }

    fn emit(&self, run_id: Uuid, event_type: &str, mut data: serde_json::Value) {
        if let Some(fields) = data.as_object_mut() {
            fields.insert("workflow".to_string(), json!(self.name));
            fields.insert("run_id".to_string(), json!(run_id));
        }
        self.event_sink.try_emit(event_type, Some(data));
    }
}

fn collaborator_failure(key: &str, error: &CollaboratorError) -> StageResult {
    warn!(stage = %key, error = %error, "Collaborator call failed");
    StageResult::failed(error.to_string())
}
