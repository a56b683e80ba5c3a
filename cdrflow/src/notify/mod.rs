//! Terminal notifiers.
//!
//! A notifier runs exactly once per finished workflow, with the full
//! payload. Both notifiers here format a subject and message and publish
//! them to a [`MessageChannel`].

mod etl;
mod report;

pub use etl::EtlResultsNotifier;
pub use report::ReportNotifier;

use crate::core::WorkflowPayload;
use crate::errors::CollaboratorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Subject used when any stage failed.
pub const FAILURE_SUBJECT: &str = "Error Processing CDRs";

/// Subject used when every stage completed.
pub const SUCCESS_SUBJECT: &str = "Processing CDRs Complete";

/// Metadata key of the query stage holding the report download link.
pub const PRESIGNED_URL_KEY: &str = "PreSignedUrl";

/// A message handed to the notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Message subject.
    pub subject: String,
    /// Message body.
    pub message: String,
    /// Id assigned by the channel, once published.
    pub message_id: Option<String>,
}

impl Notification {
    /// Creates an unpublished notification.
    #[must_use]
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
            message_id: None,
        }
    }

    /// The failure notification for an error text.
    #[must_use]
    pub fn failure(error: &str) -> Self {
        Self::new(FAILURE_SUBJECT, format!("Error Processing:  {error}"))
    }
}

/// The terminal step of a polling workflow.
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    /// Reports the outcome of a finished run.
    async fn notify(&self, payload: &WorkflowPayload) -> Result<Notification, CollaboratorError>;
}

/// Publish/subscribe notification channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Publishes a message and returns the channel's message id.
    async fn publish(&self, subject: &str, message: &str) -> Result<String, CollaboratorError>;
}

/// Publishes a notification, filling in its message id.
pub(crate) async fn publish(
    channel: &dyn MessageChannel,
    mut notification: Notification,
) -> Result<Notification, CollaboratorError> {
    let id = channel
        .publish(&notification.subject, &notification.message)
        .await?;
    tracing::info!(
        subject = %notification.subject,
        message_id = %id,
        "Notification published"
    );
    notification.message_id = Some(id);
    Ok(notification)
}
