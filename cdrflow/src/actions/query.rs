//! Report query stage actions.

use super::{ObjectStore, QueryClient, QueryRequest, QueryState};
use crate::core::{StageResult, WorkflowPayload};
use crate::errors::CollaboratorError;
use crate::notify::PRESIGNED_URL_KEY;
use crate::stages::StageAction;
use crate::utils::{idempotency_token, report_month, today_utc};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Metadata key holding the query execution id.
pub const EXECUTION_ID_KEY: &str = "QueryExecutionId";

/// Prefix under which result files are written.
pub const RESULTS_PREFIX: &str = "results/";

/// Lifetime of a report download link.
pub const PRESIGNED_URL_TTL: Duration = Duration::from_secs(3600);

/// Prefix under which custom query results are written.
pub const CUSTOM_RESULTS_PREFIX: &str = "custom/";

/// Lifetime of a custom query download link.
pub const CUSTOM_PRESIGNED_URL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Fills the `{database}` and `{table}` placeholders of a query template.
#[must_use]
pub fn render_query_template(template: &str, database: &str, table: &str) -> String {
    template
        .replace("{database}", database)
        .replace("{table}", table)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum QueryText {
    /// Per-`npanxx` usage for the report month.
    MonthlyUsage,
    /// A rendered statement, run as is.
    Fixed(String),
}

/// Runs a report query and, once it succeeds, attaches a download link for
/// the result file.
///
/// [`QueryAction::new`] aggregates usage per `npanxx` for one month;
/// [`QueryAction::custom`] runs a configured statement.
pub struct QueryAction {
    queries: Arc<dyn QueryClient>,
    store: Arc<dyn ObjectStore>,
    database: String,
    results_bucket: String,
    status_key: String,
    text: QueryText,
    results_prefix: &'static str,
    link_ttl: Duration,
    today: Option<NaiveDate>,
}

impl QueryAction {
    /// Creates a query action. Results are read back from the `"Query"`
    /// status key.
    #[must_use]
    pub fn new(
        queries: Arc<dyn QueryClient>,
        store: Arc<dyn ObjectStore>,
        database: impl Into<String>,
        results_bucket: impl Into<String>,
    ) -> Self {
        Self {
            queries,
            store,
            database: database.into(),
            results_bucket: results_bucket.into(),
            status_key: "Query".to_string(),
            text: QueryText::MonthlyUsage,
            results_prefix: RESULTS_PREFIX,
            link_ttl: PRESIGNED_URL_TTL,
            today: None,
        }
    }

    /// Creates an action that runs `query` unchanged. Results land under
    /// [`CUSTOM_RESULTS_PREFIX`] and links live for a day.
    #[must_use]
    pub fn custom(
        queries: Arc<dyn QueryClient>,
        store: Arc<dyn ObjectStore>,
        database: impl Into<String>,
        results_bucket: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            text: QueryText::Fixed(query.into()),
            results_prefix: CUSTOM_RESULTS_PREFIX,
            link_ttl: CUSTOM_PRESIGNED_URL_TTL,
            ..Self::new(queries, store, database, results_bucket)
        }
    }

    /// Pins "today" instead of reading the clock.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// The aggregation SQL for a month.
    #[must_use]
    pub fn query_for_month(&self, month: u32) -> String {
        format!(
            "SELECT npanxx, SUM(TotalDuration) AS TotalDuration, COUNT(CallCount) AS CallCount \
             FROM (SELECT npanxx, SUM(duration) AS TotalDuration, COUNT(callid) AS CallCount \
             FROM {}.processed_cdrs WHERE month='{month}' GROUP BY npanxx) GROUP BY npanxx",
            self.database
        )
    }

    /// Builds the submission for a run.
    pub fn request(&self, payload: &WorkflowPayload) -> Result<QueryRequest, CollaboratorError> {
        let query = match &self.text {
            QueryText::MonthlyUsage => {
                let month = report_month(&payload.input, self.today.unwrap_or_else(today_utc))
                    .map_err(|e| CollaboratorError::invalid_input(e.to_string()))?;
                self.query_for_month(month)
            }
            QueryText::Fixed(query) => query.clone(),
        };
        Ok(QueryRequest {
            query,
            database: self.database.clone(),
            output_location: format!("s3://{}/{}", self.results_bucket, self.results_prefix),
            client_request_token: idempotency_token(payload.run_id, &self.status_key),
        })
    }
}

impl fmt::Debug for QueryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryAction")
            .field("database", &self.database)
            .field("results_bucket", &self.results_bucket)
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StageAction for QueryAction {
    async fn start(&self, payload: &WorkflowPayload) -> Result<StageResult, CollaboratorError> {
        let request = self.request(payload)?;
        let execution_id = self.queries.start_query(&request).await?;
        tracing::info!(execution_id = %execution_id, database = %self.database, "Report query started");
        Ok(StageResult::started().with_metadata(EXECUTION_ID_KEY, json!(execution_id)))
    }

    async fn check(&self, payload: &WorkflowPayload) -> Result<StageResult, CollaboratorError> {
        let execution_id = payload
            .result(&self.status_key)
            .and_then(|r| r.metadata_str(EXECUTION_ID_KEY))
            .ok_or_else(|| {
                CollaboratorError::not_found(format!("{}.{EXECUTION_ID_KEY}", self.status_key))
            })?;

        match self.queries.query_state(execution_id).await? {
            QueryState::Succeeded => {
                let key = format!("{}{execution_id}.csv", self.results_prefix);
                let url = self
                    .store
                    .presigned_get(&self.results_bucket, &key, self.link_ttl)
                    .await?;
                Ok(StageResult::complete().with_metadata(PRESIGNED_URL_KEY, json!(url)))
            }
            state @ (QueryState::Failed | QueryState::Cancelled) => Ok(StageResult::failed(
                format!("Athena Error.  Status: {state}"),
            )),
            QueryState::Queued | QueryState::Running => Ok(StageResult::in_progress()),
        }
    }
}
