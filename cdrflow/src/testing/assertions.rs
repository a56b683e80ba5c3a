//! Assertions over workflow run reports.

use crate::workflow::{WorkflowOutcome, WorkflowRun};

/// Asserts that the run succeeded.
pub fn assert_run_succeeded(run: &WorkflowRun) {
    assert_eq!(
        run.outcome,
        WorkflowOutcome::Succeeded,
        "Expected success, payload: {:?}",
        run.instance.payload.results
    );
}

/// Asserts that the run failed at the given stage.
pub fn assert_run_failed_at(run: &WorkflowRun, stage: &str) {
    assert_eq!(
        run.outcome,
        WorkflowOutcome::Failed {
            stage: stage.to_string()
        },
        "Expected failure at '{}', payload: {:?}",
        stage,
        run.instance.payload.results
    );
}

/// Asserts exactly which stages started, in order.
pub fn assert_stages_started(run: &WorkflowRun, expected: &[&str]) {
    let started: Vec<&str> = run.stages_started().iter().map(String::as_str).collect();
    assert_eq!(started, expected, "Unexpected started stages");
}
