// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Structured Logging
//!
//! Installs the global `tracing` subscriber. The engine crates log every
//! committed state change at `info` and every rejection at `warn`; the node
//! chooses how much of that to keep (`--log-level`) and how to render it
//! (`--log-format`). `RUST_LOG`, when set, replaces the computed filter.
//!
//! Output goes to stderr so stdout stays clean for `timevault-node status`.

use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose level follows `--log-level`.
const ENGINE_TARGETS: [&str; 3] = ["timevault_node", "timevault_contracts", "timevault_protocol"];

/// Request tracing from `tower_http` is only useful when debugging the
/// engine itself.
const HTTP_TARGET: &str = "tower_http";

/// Log output format.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines with source locations.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Filter directives for `level`: the engine crates at `level`, HTTP request
/// tracing at `debug` only when the engine is at `debug` or finer.
pub fn engine_directives(level: Level) -> String {
    let http_level = if level >= Level::DEBUG {
        Level::DEBUG
    } else {
        Level::WARN
    };
    ENGINE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .chain(std::iter::once(format!("{HTTP_TARGET}={http_level}")))
        .collect::<Vec<_>>()
        .join(",")
        .to_lowercase()
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(level: Level, format: LogFormat) -> Result<(), TryInitError> {
    let directives = engine_directives(level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .try_init()?,
    }

    tracing::info!(?format, %directives, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_level_quiets_http_tracing() {
        assert_eq!(
            engine_directives(Level::INFO),
            "timevault_node=info,timevault_contracts=info,timevault_protocol=info,tower_http=warn"
        );
    }

    #[test]
    fn debug_level_enables_http_tracing() {
        let directives = engine_directives(Level::TRACE);
        assert!(directives.starts_with("timevault_node=trace,"));
        assert!(directives.ends_with("tower_http=debug"));
    }

    #[test]
    fn directives_parse_as_filter() {
        for level in [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE] {
            assert!(EnvFilter::try_new(engine_directives(level)).is_ok());
        }
    }
}
