//! Testing utilities for polling workflows.
//!
//! This module provides:
//! - Scripted stage actions and a recording notifier
//! - In-memory stand-ins for the catalog, job, query, storage and
//!   notification services
//! - Assertions over run reports

mod assertions;
mod mocks;
mod services;

pub use assertions::{assert_run_failed_at, assert_run_succeeded, assert_stages_started};
pub use mocks::{RecordingNotifier, ScriptedAction};
pub use services::{
    InMemoryCatalog, InMemoryJobs, InMemoryQueries, RecordingChannel, StaticObjectStore,
};
