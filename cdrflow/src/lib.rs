//! # cdrflow
//!
//! Polling workflows for a call detail record (CDR) processing system.
//!
//! One generic state machine drives every pipeline: for each stage it starts
//! a remote job, waits, checks its status, and then retries, advances or
//! aborts to a single terminal notifier. Four pipelines are built on it:
//!
//! - **Daily ETL**: crawl raw records, transform yesterday's records, crawl
//!   the processed output; scheduled daily
//! - **Full ETL**: the same shape over every record, triggered on demand
//! - **Monthly report**: run the billing query and mail a download link
//! - **Custom query**: run the configured query on the configured schedule
//!   and mail a day-long download link
//!
//! Deployment configuration is validated once at startup into an immutable
//! [`config::Config`]; the managed services are async traits in
//! [`actions`] and [`notify`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cdrflow::prelude::*;
//!
//! let config = RawConfig::from_env().into_config(current_year())?;
//! init_tracing(config.log_level);
//!
//! let services = EtlCollaborators::new(catalog, jobs, channel);
//! let pipeline = daily_etl(&config, &services)?;
//!
//! let run = pipeline.trigger().await;
//! println!("{:?} after {:?}", run.outcome, run.duration);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod actions;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod notify;
pub mod observability;
pub mod pipelines;
pub mod stages;
pub mod testing;
pub mod utils;
pub mod workflow;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::actions::{CatalogClient, JobClient, ObjectStore, QueryClient};
    pub use crate::config::{Config, LogLevel, RawConfig};
    pub use crate::core::{StageKind, StageResult, StageStatus, WorkflowPayload};
    pub use crate::errors::{
        CdrflowError, CollaboratorError, ConfigurationError, WorkflowBuildError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::notify::{MessageChannel, Notification, Notifier};
    pub use crate::observability::init_tracing;
    pub use crate::pipelines::{
        custom_query_report, daily_etl, full_etl, monthly_report, EtlCollaborators, Pipeline,
        ReportCollaborators,
    };
    pub use crate::stages::{PollingStage, StageAction};
    pub use crate::utils::{current_year, generate_uuid, Timestamp};
    pub use crate::workflow::{PollingWorkflow, WorkflowBuilder, WorkflowOutcome, WorkflowRun};
}
