//! Workflow builder with validation.

use super::PollingWorkflow;
use crate::errors::WorkflowBuildError;
use crate::events::{EventSink, NoOpEventSink};
use crate::notify::Notifier;
use crate::stages::PollingStage;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Overall timeout applied when none is set.
pub const DEFAULT_WORKFLOW_TIMEOUT: Duration = Duration::from_secs(8 * 60 * 60);

/// Builder for validated polling workflows.
#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    name: String,
    stages: Vec<PollingStage>,
    notifier: Option<Arc<dyn Notifier>>,
    timeout: Duration,
    event_sink: Arc<dyn EventSink>,
}

impl WorkflowBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            notifier: None,
            timeout: DEFAULT_WORKFLOW_TIMEOUT,
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Appends a stage. Stages run in the order they are added.
    #[must_use]
    pub fn stage(mut self, stage: PollingStage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Sets the terminal notifier.
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the whole-workflow wall-clock timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Validates and builds the workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no stages or no notifier, a status key
    /// is empty or repeated, or a stage waits zero time.
    pub fn build(self) -> Result<PollingWorkflow, WorkflowBuildError> {
        if self.stages.is_empty() {
            return Err(WorkflowBuildError::NoStages {
                workflow: self.name,
            });
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            stage.validate(&self.name)?;
            if !seen.insert(stage.key.as_str()) {
                return Err(WorkflowBuildError::DuplicateStageKey {
                    workflow: self.name.clone(),
                    key: stage.key.clone(),
                });
            }
        }

        let Some(notifier) = self.notifier else {
            return Err(WorkflowBuildError::MissingNotifier {
                workflow: self.name,
            });
        };

        Ok(PollingWorkflow {
            name: self.name,
            stages: self.stages,
            notifier,
            timeout: self.timeout,
            event_sink: self.event_sink,
        })
    }
}
