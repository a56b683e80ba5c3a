//! Observability utilities: subscriber setup and run summary events.

mod subscriber;
mod wide_events;

pub use subscriber::{env_filter, init_json_tracing, init_tracing};
pub use wide_events::WideEventEmitter;
