//! ETL results notifier.

use super::{publish, MessageChannel, Notification, Notifier, SUCCESS_SUBJECT};
use crate::core::WorkflowPayload;
use crate::errors::CollaboratorError;
use crate::utils::{run_date, today_utc};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::sync::Arc;

/// Reports the outcome of a daily or full ETL run.
///
/// On success the message names the processed date, resolved the same way
/// the transform job resolves it.
pub struct EtlResultsNotifier {
    channel: Arc<dyn MessageChannel>,
    today: Option<NaiveDate>,
}

impl EtlResultsNotifier {
    /// Creates a notifier publishing to `channel`.
    #[must_use]
    pub fn new(channel: Arc<dyn MessageChannel>) -> Self {
        Self {
            channel,
            today: None,
        }
    }

    /// Pins "today" instead of reading the clock.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Formats the notification for a finished payload.
    pub fn compose(&self, payload: &WorkflowPayload) -> Result<Notification, CollaboratorError> {
        if let Some(error) = payload.error_message() {
            return Ok(Notification::failure(&error));
        }

        let date = run_date(&payload.input, self.today.unwrap_or_else(today_utc))
            .map_err(|e| CollaboratorError::invalid_input(e.to_string()))?;
        Ok(Notification::new(
            SUCCESS_SUBJECT,
            format!(
                "CDR Processing Complete:  {}-{}-{}",
                date.year(),
                date.month(),
                date.day()
            ),
        ))
    }
}

impl fmt::Debug for EtlResultsNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtlResultsNotifier")
            .field("today", &self.today)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for EtlResultsNotifier {
    async fn notify(&self, payload: &WorkflowPayload) -> Result<Notification, CollaboratorError> {
        let notification = self.compose(payload)?;
        publish(self.channel.as_ref(), notification).await
    }
}
