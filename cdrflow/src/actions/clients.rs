//! External service contracts.

use crate::errors::CollaboratorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Whether a crawler is idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrawlerState {
    /// Idle; the last crawl (if any) has finished.
    Ready,
    /// Crawling.
    Running,
    /// Finishing a crawl.
    Stopping,
}

/// How a crawler's last crawl ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrawlOutcome {
    /// The crawl finished.
    Succeeded,
    /// The crawl was cancelled.
    Cancelled,
    /// The crawl failed.
    Failed,
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Point-in-time view of a crawler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlerSnapshot {
    /// Current state.
    pub state: CrawlerState,
    /// Outcome of the most recent crawl; `None` if it never ran.
    pub last_crawl: Option<CrawlOutcome>,
}

impl CrawlerSnapshot {
    /// A crawler that is still working.
    #[must_use]
    pub fn running() -> Self {
        Self {
            state: CrawlerState::Running,
            last_crawl: None,
        }
    }

    /// An idle crawler whose last crawl ended with `outcome`.
    #[must_use]
    pub fn ready(outcome: CrawlOutcome) -> Self {
        Self {
            state: CrawlerState::Ready,
            last_crawl: Some(outcome),
        }
    }
}

/// State of a batch transform job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobRunState {
    /// Accepted, not yet running.
    Starting,
    /// Waiting for capacity.
    Waiting,
    /// Running.
    Running,
    /// Being stopped.
    Stopping,
    /// Stopped on request.
    Stopped,
    /// Finished successfully.
    Succeeded,
    /// Finished with a job error.
    Failed,
    /// Finished with a service error.
    Error,
    /// Exceeded its own timeout.
    Timeout,
}

impl JobRunState {
    /// Terminal states other than success.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Failed | Self::Error | Self::Timeout | Self::Stopped
        )
    }
}

impl fmt::Display for JobRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "STARTING",
            Self::Waiting => "WAITING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
            Self::Timeout => "TIMEOUT",
        };
        f.write_str(s)
    }
}

/// State of a query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryState {
    /// Waiting to run.
    Queued,
    /// Running.
    Running,
    /// Results are available.
    Succeeded,
    /// The query failed.
    Failed,
    /// The query was cancelled.
    Cancelled,
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// A query submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// SQL text.
    pub query: String,
    /// Database the query runs against.
    pub database: String,
    /// Where result files are written.
    pub output_location: String,
    /// Idempotency token; resubmitting the same token starts no new query.
    pub client_request_token: String,
}

/// Schema catalog with crawlers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Starts a crawler.
    async fn start_crawler(&self, name: &str) -> Result<(), CollaboratorError>;

    /// Reads a crawler's state.
    async fn crawler_snapshot(&self, name: &str) -> Result<CrawlerSnapshot, CollaboratorError>;
}

/// Batch transform service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Starts a job run and returns its run id.
    async fn start_job_run(
        &self,
        job: &str,
        arguments: &BTreeMap<String, String>,
    ) -> Result<String, CollaboratorError>;

    /// Reads a job run's state.
    async fn job_run_state(&self, job: &str, run_id: &str) -> Result<JobRunState, CollaboratorError>;
}

/// Analytical query service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Submits a query and returns its execution id.
    async fn start_query(&self, request: &QueryRequest) -> Result<String, CollaboratorError>;

    /// Reads a query execution's state.
    async fn query_state(&self, execution_id: &str) -> Result<QueryState, CollaboratorError>;
}

/// Object storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Creates a time-limited download link for an object.
    async fn presigned_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, CollaboratorError>;
}
