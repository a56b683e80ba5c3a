//! Event sinks for workflow observability.
//!
//! Every workflow carries one sink; the engine emits a fixed vocabulary of
//! events (`workflow.started`, `stage.started`, `stage.polled`,
//! `stage.retry`, `stage.completed`, `stage.failed`, `workflow.notified`,
//! `workflow.notify_failed`, `workflow.timed_out`, `workflow.completed`).

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
