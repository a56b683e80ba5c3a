//! In-memory stand-ins for the external services.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use crate::actions::{
    CatalogClient, CrawlOutcome, CrawlerSnapshot, JobClient, JobRunState, ObjectStore,
    QueryClient, QueryRequest, QueryState,
};
use crate::errors::CollaboratorError;
use crate::notify::MessageChannel;

/// Pops the next scripted state, repeating the last one.
fn next_state<T: Copy>(script: &mut VecDeque<T>, fallback: T) -> T {
    match script.len() {
        0 => fallback,
        1 => script[0],
        _ => script.pop_front().unwrap_or(fallback),
    }
}

/// A catalog whose crawlers report scripted snapshots.
///
/// Unscripted crawlers are immediately ready with a successful last crawl.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    scripts: Mutex<HashMap<String, VecDeque<CrawlerSnapshot>>>,
    started: Mutex<Vec<String>>,
    unavailable: Mutex<bool>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the snapshots a crawler reports, in order.
    #[must_use]
    pub fn with_script(self, crawler: &str, snapshots: Vec<CrawlerSnapshot>) -> Self {
        self.scripts
            .lock()
            .insert(crawler.to_string(), snapshots.into());
        self
    }

    /// Makes every call fail as if the service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }

    /// Crawlers started, in order.
    #[must_use]
    pub fn started(&self) -> Vec<String> {
        self.started.lock().clone()
    }

    fn ensure_available(&self) -> Result<(), CollaboratorError> {
        if *self.unavailable.lock() {
            return Err(CollaboratorError::unavailable("catalog", "service unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn start_crawler(&self, name: &str) -> Result<(), CollaboratorError> {
        self.ensure_available()?;
        self.started.lock().push(name.to_string());
        Ok(())
    }

    async fn crawler_snapshot(&self, name: &str) -> Result<CrawlerSnapshot, CollaboratorError> {
        self.ensure_available()?;
        let fallback = CrawlerSnapshot::ready(CrawlOutcome::Succeeded);
        Ok(self
            .scripts
            .lock()
            .get_mut(name)
            .map_or(fallback, |script| next_state(script, fallback)))
    }
}

/// A transform service whose job runs report scripted states.
///
/// Unscripted jobs succeed on the first check.
#[derive(Debug, Default)]
pub struct InMemoryJobs {
    scripts: Mutex<HashMap<String, VecDeque<JobRunState>>>,
    runs: Mutex<Vec<(String, BTreeMap<String, String>)>>,
}

impl InMemoryJobs {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the states a job's runs report, in order.
    #[must_use]
    pub fn with_script(self, job: &str, states: Vec<JobRunState>) -> Self {
        self.scripts.lock().insert(job.to_string(), states.into());
        self
    }

    /// Job runs started, with their arguments.
    #[must_use]
    pub fn runs(&self) -> Vec<(String, BTreeMap<String, String>)> {
        self.runs.lock().clone()
    }
}

#[async_trait]
impl JobClient for InMemoryJobs {
    async fn start_job_run(
        &self,
        job: &str,
        arguments: &BTreeMap<String, String>,
    ) -> Result<String, CollaboratorError> {
        let mut runs = self.runs.lock();
        runs.push((job.to_string(), arguments.clone()));
        Ok(format!("jr_{}", runs.len()))
    }

    async fn job_run_state(&self, job: &str, run_id: &str) -> Result<JobRunState, CollaboratorError> {
        let known = self
            .runs
            .lock()
            .iter()
            .enumerate()
            .any(|(i, (j, _))| j == job && run_id == format!("jr_{}", i + 1));
        if !known {
            return Err(CollaboratorError::not_found(format!("{job}/{run_id}")));
        }

        Ok(self
            .scripts
            .lock()
            .get_mut(job)
            .map_or(JobRunState::Succeeded, |script| {
                next_state(script, JobRunState::Succeeded)
            }))
    }
}

/// A query service whose executions report scripted states.
///
/// Submissions are idempotent on the client request token.
#[derive(Debug, Default)]
pub struct InMemoryQueries {
    script: Mutex<VecDeque<QueryState>>,
    executions: Mutex<Vec<QueryRequest>>,
}

impl InMemoryQueries {
    /// Creates a service whose queries succeed on the first check.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the states every execution reports, in order.
    #[must_use]
    pub fn with_script(self, states: Vec<QueryState>) -> Self {
        *self.script.lock() = states.into();
        self
    }

    /// Distinct submissions received.
    #[must_use]
    pub fn requests(&self) -> Vec<QueryRequest> {
        self.executions.lock().clone()
    }
}

#[async_trait]
impl QueryClient for InMemoryQueries {
    async fn start_query(&self, request: &QueryRequest) -> Result<String, CollaboratorError> {
        let mut executions = self.executions.lock();
        let index = match executions
            .iter()
            .position(|r| r.client_request_token == request.client_request_token)
        {
            Some(existing) => existing,
            None => {
                executions.push(request.clone());
                executions.len() - 1
            }
        };
        Ok(format!("q-{}", index + 1))
    }

    async fn query_state(&self, execution_id: &str) -> Result<QueryState, CollaboratorError> {
        let count = self.executions.lock().len();
        let known = (1..=count).any(|i| execution_id == format!("q-{i}"));
        if !known {
            return Err(CollaboratorError::not_found(execution_id));
        }
        Ok(next_state(&mut self.script.lock(), QueryState::Succeeded))
    }
}

/// A notification channel that keeps every published message.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingChannel {
    /// Creates an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Published `(subject, message)` pairs, in order.
    #[must_use]
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().clone()
    }

    /// Number of messages published.
    #[must_use]
    pub fn len(&self) -> usize {
        self.published.lock().len()
    }

    /// Returns true if nothing was published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.published.lock().is_empty()
    }
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    async fn publish(&self, subject: &str, message: &str) -> Result<String, CollaboratorError> {
        let mut published = self.published.lock();
        published.push((subject.to_string(), message.to_string()));
        Ok(format!("msg-{}", published.len()))
    }
}

/// Object storage that signs links with a fixed host.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticObjectStore;

#[async_trait]
impl ObjectStore for StaticObjectStore {
    async fn presigned_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, CollaboratorError> {
        Ok(format!(
            "https://{bucket}.storage.example.test/{key}?expires={}",
            expires_in.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::CrawlerState;

    #[tokio::test]
    async fn test_catalog_script_repeats_last() {
        let catalog = InMemoryCatalog::new().with_script(
            "raw",
            vec![
                CrawlerSnapshot::running(),
                CrawlerSnapshot::ready(CrawlOutcome::Failed),
            ],
        );
        catalog.start_crawler("raw").await.unwrap();

        assert_eq!(
            catalog.crawler_snapshot("raw").await.unwrap().state,
            CrawlerState::Running
        );
        for _ in 0..2 {
            assert_eq!(
                catalog.crawler_snapshot("raw").await.unwrap(),
                CrawlerSnapshot::ready(CrawlOutcome::Failed)
            );
        }
        assert_eq!(
            catalog.crawler_snapshot("other").await.unwrap(),
            CrawlerSnapshot::ready(CrawlOutcome::Succeeded)
        );
        assert_eq!(catalog.started(), vec!["raw".to_string()]);
    }

    #[tokio::test]
    async fn test_catalog_unavailable() {
        let catalog = InMemoryCatalog::new();
        catalog.set_unavailable(true);
        assert!(catalog.start_crawler("raw").await.is_err());
    }

    #[tokio::test]
    async fn test_jobs_reject_unknown_run() {
        let jobs = InMemoryJobs::new();
        let run_id = jobs.start_job_run("etl", &BTreeMap::new()).await.unwrap();
        assert_eq!(run_id, "jr_1");
        assert_eq!(
            jobs.job_run_state("etl", "jr_1").await.unwrap(),
            JobRunState::Succeeded
        );
        assert!(jobs.job_run_state("etl", "jr_9").await.is_err());
    }

    #[tokio::test]
    async fn test_queries_are_idempotent_on_token() {
        let queries = InMemoryQueries::new();
        let request = QueryRequest {
            query: "SELECT 1".to_string(),
            database: "db".to_string(),
            output_location: "s3://results/results/".to_string(),
            client_request_token: "token".to_string(),
        };

        let first = queries.start_query(&request).await.unwrap();
        let second = queries.start_query(&request).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(queries.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_channel_and_store() {
        let channel = RecordingChannel::new();
        assert_eq!(channel.publish("s", "m").await.unwrap(), "msg-1");
        assert_eq!(channel.len(), 1);

        let url = StaticObjectStore
            .presigned_get("bucket", "results/q-1.csv", Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(
            url,
            "https://bucket.storage.example.test/results/q-1.csv?expires=3600"
        );
    }
}
