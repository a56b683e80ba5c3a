//! `tracing-subscriber` setup.

use crate::config::LogLevel;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Builds the filter: `RUST_LOG` when set and valid, else the configured level.
#[must_use]
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()))
}

/// Installs a human-readable global subscriber writing to stderr.
///
/// Returns false if a global subscriber was already installed; calling it
/// twice is harmless.
pub fn init_tracing(level: LogLevel) -> bool {
    try_init_pretty(level, std::io::stderr)
}

/// Installs a JSON-lines global subscriber writing to stderr.
pub fn init_json_tracing(level: LogLevel) -> bool {
    try_init_json(level, std::io::stderr)
}

fn try_init_pretty<W>(level: LogLevel, writer: W) -> bool
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(writer)
        .with_target(true)
        .try_init()
        .is_ok()
}

fn try_init_json<W>(level: LogLevel, writer: W) -> bool
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(level))
        .with_writer(writer)
        .with_current_span(true)
        .try_init()
        .is_ok()
}
