//! Wide events: one comprehensive event per finished run.

use crate::events::EventSink;
use crate::workflow::{WorkflowOutcome, WorkflowRun};
use serde_json::json;

/// Builds and emits a single summary event per workflow run.
#[derive(Debug, Clone)]
pub struct WideEventEmitter {
    /// Event type used for run summaries.
    pub run_event_type: String,
}

impl Default for WideEventEmitter {
    fn default() -> Self {
        Self {
            run_event_type: "workflow.wide".to_string(),
        }
    }
}

impl WideEventEmitter {
    /// Creates a new wide event emitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the summary payload of a run.
    #[must_use]
    pub fn build_run_payload(run: &WorkflowRun) -> serde_json::Value {
        let status = match &run.outcome {
            WorkflowOutcome::Succeeded => "succeeded",
            WorkflowOutcome::Failed { .. } => "failed",
            WorkflowOutcome::TimedOut => "timed_out",
        };

        let stage_details: Vec<serde_json::Value> = run
            .stages_started()
            .iter()
            .map(|key| {
                let result = run.instance.payload.result(key);
                json!({
                    "stage": key,
                    "status": result.map(|r| r.status().to_string()),
                    "checks": run.checks(key),
                    "retries": run.retries(key),
                    "error": result.and_then(|r| r.error_message.clone()),
                })
            })
            .collect();

        let mut payload = json!({
            "workflow": run.instance.workflow,
            "run_id": run.instance.id.to_string(),
            "started_at": run.instance.started_at.to_rfc3339(),
            "status": status,
            "duration_ms": u64::try_from(run.duration.as_millis()).unwrap_or(u64::MAX),
            "transitions": run.instance.history.len(),
            "notified": run.notified(),
            "stage_details": stage_details,
        });

        if let WorkflowOutcome::Failed { stage } = &run.outcome {
            payload["failed_stage"] = json!(stage);
        }
        if let Some(err) = &run.notification_error {
            payload["notification_error"] = json!(err);
        }

        payload
    }

    /// Emits the summary of a run.
    pub fn emit_run_event(&self, sink: &dyn EventSink, run: &WorkflowRun) {
        sink.try_emit(&self.run_event_type, Some(Self::build_run_payload(run)));
    }
}
