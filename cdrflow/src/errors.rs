//! Error types for the cdrflow crate.
//!
//! Configuration errors are fatal and surface before any workflow exists.
//! Stage failures are data, not errors: they travel through
//! [`StageResult`](crate::core::StageResult) and never leave a workflow run.
//! The only error a collaborator can raise is [`CollaboratorError`], and the
//! workflow converts it into a failed stage.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for cdrflow operations.
#[derive(Debug, Error)]
pub enum CdrflowError {
    /// Deployment configuration was rejected by the validator.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// A workflow definition was malformed.
    #[error("{0}")]
    WorkflowBuild(#[from] WorkflowBuildError),

    /// An external collaborator call failed.
    #[error("{0}")]
    Collaborator(#[from] CollaboratorError),

    /// A schedule expression was malformed.
    #[error("{0}")]
    Schedule(#[from] ScheduleError),

    /// A namespace was malformed.
    #[error("{0}")]
    Namespace(#[from] NamespaceError),
}

/// A single rejected configuration field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigViolation {
    /// The configuration field that failed validation.
    pub field: String,
    /// Human-readable reason.
    pub message: String,
}

impl ConfigViolation {
    /// Creates a new violation.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Raised when deployment configuration fails validation.
///
/// Every violation found is kept; the display form joins their messages
/// with `"; "`, so a single violation displays as exactly its message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.messages().join("; "))]
pub struct ConfigurationError {
    /// Violations in the order the checks ran.
    pub violations: Vec<ConfigViolation>,
}

impl ConfigurationError {
    /// Creates an error from a list of violations.
    #[must_use]
    pub fn new(violations: Vec<ConfigViolation>) -> Self {
        Self { violations }
    }

    /// Creates an error with one violation.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![ConfigViolation::new(field, message)])
    }

    /// Returns the violation messages.
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.message.as_str()).collect()
    }

    /// Returns true if the given field was rejected.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("ConfigurationError"));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map.insert(
            "violations".to_string(),
            serde_json::to_value(&self.violations).unwrap_or_default(),
        );
        map
    }
}

/// Raised when a workflow definition cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowBuildError {
    /// The workflow has no stages.
    #[error("Workflow '{workflow}' must have at least one stage")]
    NoStages {
        /// The workflow name.
        workflow: String,
    },

    /// The workflow has no notifier.
    #[error("Workflow '{workflow}' has no notifier")]
    MissingNotifier {
        /// The workflow name.
        workflow: String,
    },

    /// A stage has an empty status key.
    #[error("Workflow '{workflow}' has a stage with an empty status key")]
    EmptyStageKey {
        /// The workflow name.
        workflow: String,
    },

    /// Two stages share the same status key.
    #[error("Workflow '{workflow}' declares status key '{key}' more than once")]
    DuplicateStageKey {
        /// The workflow name.
        workflow: String,
        /// The duplicated key.
        key: String,
    },

    /// A stage waits zero time between checks.
    #[error("Stage '{key}' in workflow '{workflow}' must wait a non-zero duration")]
    ZeroWait {
        /// The workflow name.
        workflow: String,
        /// The stage key.
        key: String,
    },
}

/// Errors raised by external collaborators (catalog, jobs, queries, storage, messaging).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// The service could not be reached or refused the call.
    #[error("Service unavailable: {service} - {reason}")]
    Unavailable {
        /// The service name.
        service: String,
        /// The reason.
        reason: String,
    },

    /// A named resource does not exist.
    #[error("Resource not found: {resource}")]
    NotFound {
        /// The resource name.
        resource: String,
    },

    /// The payload did not carry what the call needs.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Any other failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CollaboratorError {
    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        match self {
            Self::Unavailable { service, reason } => {
                map.insert("type".to_string(), serde_json::json!("Unavailable"));
                map.insert("service".to_string(), serde_json::json!(service));
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
            Self::NotFound { resource } => {
                map.insert("type".to_string(), serde_json::json!("NotFound"));
                map.insert("resource".to_string(), serde_json::json!(resource));
            }
            Self::InvalidInput(reason) => {
                map.insert("type".to_string(), serde_json::json!("InvalidInput"));
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
            Self::Internal(reason) => {
                map.insert("type".to_string(), serde_json::json!("Internal"));
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
        }

        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Raised when a schedule expression is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid schedule expression '{expression}': expected cron(<min> <hour> <day-of-month> <month> <day-of-week> <year>)")]
pub struct ScheduleError {
    /// The rejected expression.
    pub expression: String,
}

/// Raised when a namespace is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid namespace '{value}': must be 3-32 lowercase ASCII letters or digits")]
pub struct NamespaceError {
    /// The rejected value.
    pub value: String,
}
