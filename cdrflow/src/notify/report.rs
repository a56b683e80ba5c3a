//! Report notifiers.

use super::{publish, MessageChannel, Notification, Notifier, PRESIGNED_URL_KEY, SUCCESS_SUBJECT};
use crate::core::WorkflowPayload;
use crate::errors::CollaboratorError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Status key of the report's query stage.
const QUERY_KEY: &str = "Query";

const MONTHLY_LEAD: &str = "CDR Processing Complete:  ";
const CUSTOM_LEAD: &str = "Please open the following link to view the generated CDR report. ";

/// Sends the report download link, or the failure text.
pub struct ReportNotifier {
    channel: Arc<dyn MessageChannel>,
    lead: &'static str,
}

impl ReportNotifier {
    /// Creates the monthly report notifier publishing to `channel`.
    #[must_use]
    pub fn new(channel: Arc<dyn MessageChannel>) -> Self {
        Self {
            channel,
            lead: MONTHLY_LEAD,
        }
    }

    /// Creates the custom query report notifier publishing to `channel`.
    #[must_use]
    pub fn custom(channel: Arc<dyn MessageChannel>) -> Self {
        Self {
            channel,
            lead: CUSTOM_LEAD,
        }
    }

    /// Formats the notification for a finished payload.
    pub fn compose(&self, payload: &WorkflowPayload) -> Result<Notification, CollaboratorError> {
        if let Some(error) = payload.error_message() {
            return Ok(Notification::failure(&error));
        }

        let url = payload
            .result(QUERY_KEY)
            .and_then(|r| r.metadata_str(PRESIGNED_URL_KEY))
            .ok_or_else(|| CollaboratorError::not_found(format!("{QUERY_KEY}.{PRESIGNED_URL_KEY}")))?;
        Ok(Notification::new(SUCCESS_SUBJECT, format!("{}{url}", self.lead)))
    }
}

impl fmt::Debug for ReportNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportNotifier").finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for ReportNotifier {
    async fn notify(&self, payload: &WorkflowPayload) -> Result<Notification, CollaboratorError> {
        let notification = self.compose(payload)?;
        publish(self.channel.as_ref(), notification).await
    }
}
