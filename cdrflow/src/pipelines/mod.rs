//! The daily ETL, full ETL, monthly report and custom query pipelines.
//!
//! Each pipeline is the generic polling workflow bound to concrete stage
//! actions, a notifier and (except for the full ETL) a schedule. Every
//! resource name derives from one [`Namespace`].

mod builders;
mod naming;
mod schedule;

pub use builders::{
    custom_query_report, daily_etl, full_etl, monthly_report, EtlCollaborators,
    ReportCollaborators, CRAWL_WAIT, ETL_TIMEOUT, PROCESSED_CRAWL_WAIT, QUERY_WAIT,
    REPORT_TIMEOUT, TRANSFORM_WAIT,
};
pub use naming::{Namespace, PipelineDescriptor, ResourceNames, PROCESSED_TABLE, RAW_TABLE};
pub use schedule::Schedule;

use crate::workflow::{PollingWorkflow, WorkflowRun};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which pipeline a [`Pipeline`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    /// Scheduled ETL over yesterday's records.
    DailyEtl,
    /// On-demand reprocessing of all records.
    FullEtl,
    /// Scheduled monthly billing report.
    MonthlyReport,
    /// Configured query on the configured schedule.
    CustomQuery,
}

impl PipelineKind {
    /// Short kebab-case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DailyEtl => "daily-etl",
            Self::FullEtl => "full-etl",
            Self::MonthlyReport => "monthly-report",
            Self::CustomQuery => "custom-query",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A polling workflow bound to its resources and schedule.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Which pipeline this is.
    pub kind: PipelineKind,
    /// Crawlers and job, for the ETL pipelines.
    pub descriptor: Option<PipelineDescriptor>,
    /// Trigger schedule; `None` for on-demand pipelines.
    pub schedule: Option<Schedule>,
    /// The shared workflow definition.
    pub workflow: Arc<PollingWorkflow>,
}

impl Pipeline {
    /// Runs a fresh instance with an empty trigger payload.
    pub async fn trigger(&self) -> WorkflowRun {
        self.run_with_input(serde_json::json!({})).await
    }

    /// Runs a fresh instance with a manual or backfill payload, such as
    /// `{"Date": "2024-03-05"}` or `{"Month": 2}`.
    pub async fn run_with_input(&self, input: serde_json::Value) -> WorkflowRun {
        tracing::info!(pipeline = %self.kind, "Pipeline triggered");
        self.workflow.run(input).await
    }
}

/// Runs several pipeline instances at once and returns their reports in
/// the order given.
pub async fn run_concurrently(runs: Vec<(&Pipeline, serde_json::Value)>) -> Vec<WorkflowRun> {
    join_all(
        runs.into_iter()
            .map(|(pipeline, input)| pipeline.run_with_input(input)),
    )
    .await
}
