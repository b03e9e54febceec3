//! Subscriber setup for the `tapay` binary.
//!
//! Commands print their result (a URI or JSON) on stdout, so every log line
//! goes to stderr. `RUST_LOG` wins over `--log-level` when both are set.

use std::io;

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Colored, multi-field lines for a terminal.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Install the global subscriber. Must run once, before any command.
///
/// `default_level` is an `EnvFilter` directive such as `warn` or
/// `tapay=debug,tapay_protocol=trace`.
pub fn init_logging(default_level: &str, format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_current_span(false),
            )
            .init(),
    }

    tracing::debug!(?format, "logging initialized");
}
