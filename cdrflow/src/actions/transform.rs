//! Batch transform job stage action.

use super::{JobClient, JobRunState};
use crate::core::{StageResult, WorkflowPayload};
use crate::errors::CollaboratorError;
use crate::stages::StageAction;
use crate::utils::{run_date, today_utc};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Metadata key holding the job run id.
pub const RUN_ID_KEY: &str = "runId";

/// Where a transform job writes its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformTarget {
    /// Destination bucket for processed records.
    pub dest_bucket: String,
    /// Catalog database.
    pub database: String,
    /// Raw records table.
    pub table: String,
}

/// Starts a transform job run for one day of records and polls it.
pub struct TransformJobAction {
    jobs: Arc<dyn JobClient>,
    job: String,
    target: TransformTarget,
    status_key: String,
    today: Option<NaiveDate>,
}

impl TransformJobAction {
    /// Creates an action driving the named job. Results are read back from
    /// the `"ETL"` status key.
    #[must_use]
    pub fn new(jobs: Arc<dyn JobClient>, job: impl Into<String>, target: TransformTarget) -> Self {
        Self {
            jobs,
            job: job.into(),
            target,
            status_key: "ETL".to_string(),
            today: None,
        }
    }

    /// Pins "today" instead of reading the clock.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Builds the job arguments for a run date.
    #[must_use]
    pub fn arguments(&self, date: NaiveDate) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("--DEST_BUCKET".to_string(), self.target.dest_bucket.clone()),
            ("--DATABASE".to_string(), self.target.database.clone()),
            ("--TABLE".to_string(), self.target.table.clone()),
            ("--YEAR".to_string(), date.year().to_string()),
            ("--MONTH".to_string(), format!("{:02}", date.month())),
            ("--DATE".to_string(), format!("{:02}", date.day())),
        ])
    }
}

impl fmt::Debug for TransformJobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformJobAction")
            .field("job", &self.job)
            .field("target", &self.target)
            .field("status_key", &self.status_key)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StageAction for TransformJobAction {
    async fn start(&self, payload: &WorkflowPayload) -> Result<StageResult, CollaboratorError> {
        let date = run_date(&payload.input, self.today.unwrap_or_else(today_utc))
            .map_err(|e| CollaboratorError::invalid_input(e.to_string()))?;
        let run_id = self.jobs.start_job_run(&self.job, &self.arguments(date)).await?;
        tracing::info!(job = %self.job, run_id = %run_id, date = %date, "Transform job started");
        Ok(StageResult::started().with_metadata(RUN_ID_KEY, json!(run_id)))
    }

    async fn check(&self, payload: &WorkflowPayload) -> Result<StageResult, CollaboratorError> {
        let run_id = payload
            .result(&self.status_key)
            .and_then(|r| r.metadata_str(RUN_ID_KEY))
            .ok_or_else(|| {
                CollaboratorError::not_found(format!("{}.{RUN_ID_KEY}", self.status_key))
            })?;

        let state = self.jobs.job_run_state(&self.job, run_id).await?;
        Ok(match state {
            JobRunState::Succeeded => StageResult::complete(),
            s if s.is_failure() => StageResult::failed(format!("Error in ETL.  ETL Status: {s}")),
            _ => StageResult::in_progress(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::MockJobClient;
    use mockall::predicate::{always, eq};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn target() -> TransformTarget {
        TransformTarget {
            dest_bucket: "processed-abc".to_string(),
            database: "cdrs_abc".to_string(),
            table: "amazon_chime_voice_connector_cdrs".to_string(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn started_payload(run_id: &str) -> WorkflowPayload {
        let mut payload = WorkflowPayload::new(Uuid::new_v4(), json!({}));
        payload.record(
            "ETL",
            StageResult::started().with_metadata(RUN_ID_KEY, json!(run_id)),
        );
        payload
    }

    #[test]
    fn test_arguments_zero_pad() {
        let action = TransformJobAction::new(Arc::new(MockJobClient::new()), "cdrDailyETLabc", target());
        let args = action.arguments(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let expected = BTreeMap::from([
            ("--DEST_BUCKET".to_string(), "processed-abc".to_string()),
            ("--DATABASE".to_string(), "cdrs_abc".to_string()),
            ("--TABLE".to_string(), "amazon_chime_voice_connector_cdrs".to_string()),
            ("--YEAR".to_string(), "2024".to_string()),
            ("--MONTH".to_string(), "02".to_string()),
            ("--DATE".to_string(), "29".to_string()),
        ]);
        assert_eq!(args, expected);
    }

    #[tokio::test]
    async fn test_start_defaults_to_yesterday_across_month_boundary() {
        let mut jobs = MockJobClient::new();
        jobs.expect_start_job_run()
            .withf(|job, args| {
                job == "cdrDailyETLabc"
                    && args.get("--YEAR").map(String::as_str) == Some("2024")
                    && args.get("--MONTH").map(String::as_str) == Some("02")
                    && args.get("--DATE").map(String::as_str) == Some("29")
            })
            .times(1)
            .returning(|_, _| Ok("jr_1".to_string()));

        let action = TransformJobAction::new(Arc::new(jobs), "cdrDailyETLabc", target())
            .with_today(today());
        let payload = WorkflowPayload::new(Uuid::new_v4(), json!({}));
        let result = action.start(&payload).await.unwrap();

        assert!(!result.complete && !result.failure);
        assert_eq!(result.metadata_str(RUN_ID_KEY), Some("jr_1"));
    }

    #[tokio::test]
    async fn test_start_uses_explicit_date() {
        let mut jobs = MockJobClient::new();
        jobs.expect_start_job_run()
            .withf(|_, args| {
                args.get("--MONTH").map(String::as_str) == Some("12")
                    && args.get("--DATE").map(String::as_str) == Some("07")
            })
            .returning(|_, _| Ok("jr_2".to_string()));

        let action = TransformJobAction::new(Arc::new(jobs), "cdrFullETLabc", target())
            .with_today(today());
        let payload = WorkflowPayload::new(Uuid::new_v4(), json!({"Date": "2023-12-07"}));
        assert!(action.start(&payload).await.is_ok());
    }

    #[tokio::test]
    async fn test_start_rejects_bad_date() {
        let mut jobs = MockJobClient::new();
        jobs.expect_start_job_run().never();

        let action = TransformJobAction::new(Arc::new(jobs), "cdrDailyETLabc", target());
        let payload = WorkflowPayload::new(Uuid::new_v4(), json!({"Date": "2023-13-40"}));
        let err = action.start(&payload).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_check_classification() {
        let cases = [
            (JobRunState::Succeeded, "complete"),
            (JobRunState::Running, "in_progress"),
            (JobRunState::Starting, "in_progress"),
            (JobRunState::Waiting, "in_progress"),
            (JobRunState::Stopping, "in_progress"),
            (JobRunState::Failed, "failed"),
            (JobRunState::Error, "failed"),
            (JobRunState::Timeout, "failed"),
            (JobRunState::Stopped, "failed"),
        ];

        for (state, expected) in cases {
            let mut jobs = MockJobClient::new();
            jobs.expect_job_run_state()
                .with(eq("cdrDailyETLabc"), eq("jr_1"))
                .returning(move |_, _| Ok(state));
            let action = TransformJobAction::new(Arc::new(jobs), "cdrDailyETLabc", target());

            let result = action.check(&started_payload("jr_1")).await.unwrap();
            assert_eq!(result.status().to_string(), expected, "state {state}");
            if result.is_failure() {
                assert_eq!(
                    result.error_message,
                    Some(format!("Error in ETL.  ETL Status: {state}"))
                );
            }
        }
    }

    #[tokio::test]
    async fn test_check_without_run_id() {
        let mut jobs = MockJobClient::new();
        jobs.expect_job_run_state().with(always(), always()).never();

        let action = TransformJobAction::new(Arc::new(jobs), "cdrDailyETLabc", target());
        let payload = WorkflowPayload::new(Uuid::new_v4(), json!({}));
        let err = action.check(&payload).await.unwrap_err();
        assert_eq!(err, CollaboratorError::not_found("ETL.runId"));
    }
}
