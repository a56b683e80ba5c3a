//! Builders for the three pipelines.

use super::{Pipeline, PipelineDescriptor, PipelineKind, Schedule};
use crate::actions::{
    render_query_template, CatalogClient, CrawlerAction, JobClient, ObjectStore, QueryAction,
    QueryClient, TransformJobAction, TransformTarget,
};
use crate::config::Config;
use crate::core::StageKind;
use crate::errors::WorkflowBuildError;
use crate::events::{EventSink, NoOpEventSink};
use crate::notify::{EtlResultsNotifier, MessageChannel, ReportNotifier};
use crate::stages::PollingStage;
use crate::workflow::WorkflowBuilder;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

/// Wait after starting the raw crawler.
pub const CRAWL_WAIT: Duration = Duration::from_secs(120);
/// Wait between transform job checks.
pub const TRANSFORM_WAIT: Duration = Duration::from_secs(10);
/// Wait between processed crawler checks.
pub const PROCESSED_CRAWL_WAIT: Duration = Duration::from_secs(10);
/// Wait between query checks.
pub const QUERY_WAIT: Duration = Duration::from_secs(5);
/// Overall limit of an ETL run.
pub const ETL_TIMEOUT: Duration = Duration::from_secs(8 * 60 * 60);
/// Overall limit of a report run.
pub const REPORT_TIMEOUT: Duration = Duration::from_secs(3 * 60 * 60);

/// Services the ETL pipelines talk to.
#[derive(Clone)]
pub struct EtlCollaborators {
    /// Schema catalog with crawlers.
    pub catalog: Arc<dyn CatalogClient>,
    /// Batch transform service.
    pub jobs: Arc<dyn JobClient>,
    /// Notification channel.
    pub channel: Arc<dyn MessageChannel>,
    /// Event sink; `None` discards events.
    pub event_sink: Option<Arc<dyn EventSink>>,
    /// Pins the calendar date; `None` reads the clock.
    pub today: Option<NaiveDate>,
}

impl EtlCollaborators {
    /// Bundles the required services.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        jobs: Arc<dyn JobClient>,
        channel: Arc<dyn MessageChannel>,
    ) -> Self {
        Self {
            catalog,
            jobs,
            channel,
            event_sink: None,
            today: None,
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Pins the calendar date.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

/// Services the report pipeline talks to.
#[derive(Clone)]
pub struct ReportCollaborators {
    /// Query service.
    pub queries: Arc<dyn QueryClient>,
    /// Object storage for result links.
    pub store: Arc<dyn ObjectStore>,
    /// Notification channel.
    pub channel: Arc<dyn MessageChannel>,
    /// Event sink; `None` discards events.
    pub event_sink: Option<Arc<dyn EventSink>>,
    /// Pins the calendar date; `None` reads the clock.
    pub today: Option<NaiveDate>,
}

impl ReportCollaborators {
    /// Bundles the required services.
    #[must_use]
    pub fn new(
        queries: Arc<dyn QueryClient>,
        store: Arc<dyn ObjectStore>,
        channel: Arc<dyn MessageChannel>,
    ) -> Self {
        Self {
            queries,
            store,
            channel,
            event_sink: None,
            today: None,
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Pins the calendar date.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

fn sink_or_noop(sink: Option<&Arc<dyn EventSink>>) -> Arc<dyn EventSink> {
    sink.cloned().unwrap_or_else(|| Arc::new(NoOpEventSink))
}

fn raw_bucket(config: &Config) -> String {
    config
        .raw_cdrs_bucket
        .clone()
        .unwrap_or_else(|| config.resources.raw_bucket.clone())
}

/// Crawl, transform, crawl again; then report.
fn etl_pipeline(
    kind: PipelineKind,
    descriptor: PipelineDescriptor,
    schedule: Option<Schedule>,
    config: &Config,
    services: &EtlCollaborators,
) -> Result<Pipeline, WorkflowBuildError> {
    let target = TransformTarget {
        dest_bucket: config.resources.processed_bucket.clone(),
        database: config.resources.database.clone(),
        table: config.resources.raw_table.clone(),
    };
    let mut transform = TransformJobAction::new(services.jobs.clone(), &descriptor.etl_job, target);
    let mut notifier = EtlResultsNotifier::new(services.channel.clone());
    if let Some(today) = services.today {
        transform = transform.with_today(today);
        notifier = notifier.with_today(today);
    }

    let workflow = WorkflowBuilder::new(format!("{}-{}", kind.as_str(), config.namespace))
        .stage(PollingStage::new(
            "Crawl",
            StageKind::Crawl,
            Arc::new(CrawlerAction::new(services.catalog.clone(), &descriptor.raw_crawler)),
            CRAWL_WAIT,
        ))
        .stage(PollingStage::new(
            "ETL",
            StageKind::Transform,
            Arc::new(transform),
            TRANSFORM_WAIT,
        ))
        .stage(PollingStage::new(
            "Processed",
            StageKind::Crawl,
            Arc::new(CrawlerAction::new(
                services.catalog.clone(),
                &descriptor.processed_crawler,
            )),
            PROCESSED_CRAWL_WAIT,
        ))
        .notifier(Arc::new(notifier))
        .timeout(ETL_TIMEOUT)
        .event_sink(sink_or_noop(services.event_sink.as_ref()))
        .build()?;

    Ok(Pipeline {
        kind,
        descriptor: Some(descriptor),
        schedule,
        workflow: Arc::new(workflow),
    })
}

/// The scheduled daily ETL over yesterday's records.
pub fn daily_etl(config: &Config, services: &EtlCollaborators) -> Result<Pipeline, WorkflowBuildError> {
    let descriptor = PipelineDescriptor::daily(&config.namespace, raw_bucket(config));
    etl_pipeline(
        PipelineKind::DailyEtl,
        descriptor,
        Some(Schedule::daily_etl()),
        config,
        services,
    )
}

/// The on-demand full reprocessing ETL.
///
/// Crawls the secondary bucket when one is configured.
pub fn full_etl(config: &Config, services: &EtlCollaborators) -> Result<Pipeline, WorkflowBuildError> {
    let source = config
        .additional_cdrs_bucket
        .clone()
        .unwrap_or_else(|| raw_bucket(config));
    let descriptor = PipelineDescriptor::full(&config.namespace, source);
    etl_pipeline(PipelineKind::FullEtl, descriptor, None, config, services)
}

/// The scheduled monthly billing report.
pub fn monthly_report(
    config: &Config,
    services: &ReportCollaborators,
) -> Result<Pipeline, WorkflowBuildError> {
    let mut query = QueryAction::new(
        services.queries.clone(),
        services.store.clone(),
        &config.resources.database,
        &config.resources.results_bucket,
    );
    if let Some(today) = services.today {
        query = query.with_today(today);
    }

    let workflow = WorkflowBuilder::new(format!(
        "{}-{}",
        PipelineKind::MonthlyReport.as_str(),
        config.namespace
    ))
    .stage(PollingStage::new("Query", StageKind::Query, Arc::new(query), QUERY_WAIT))
    .notifier(Arc::new(ReportNotifier::new(services.channel.clone())))
    .timeout(REPORT_TIMEOUT)
    .event_sink(sink_or_noop(services.event_sink.as_ref()))
    .build()?;

    Ok(Pipeline {
        kind: PipelineKind::MonthlyReport,
        descriptor: None,
        schedule: Some(Schedule::monthly_report()),
        workflow: Arc::new(workflow),
    })
}

/// The configured custom query on the configured schedule.
///
/// The query template is rendered against the processed CDR table and the
/// result link is mailed when it succeeds.
pub fn custom_query_report(
    config: &Config,
    services: &ReportCollaborators,
) -> Result<Pipeline, WorkflowBuildError> {
    let sql = render_query_template(
        &config.athena_query,
        &config.resources.database,
        &config.resources.processed_table,
    );
    let query = QueryAction::custom(
        services.queries.clone(),
        services.store.clone(),
        &config.resources.database,
        &config.resources.results_bucket,
        sql,
    );

    let workflow = WorkflowBuilder::new(format!(
        "{}-{}",
        PipelineKind::CustomQuery.as_str(),
        config.namespace
    ))
    .stage(PollingStage::new("Query", StageKind::Query, Arc::new(query), QUERY_WAIT))
    .notifier(Arc::new(ReportNotifier::custom(services.channel.clone())))
    .timeout(REPORT_TIMEOUT)
    .event_sink(sink_or_noop(services.event_sink.as_ref()))
    .build()?;

    Ok(Pipeline {
        kind: PipelineKind::CustomQuery,
        descriptor: None,
        schedule: Some(config.query_schedule.clone()),
        workflow: Arc::new(workflow),
    })
}
