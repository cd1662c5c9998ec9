//! Tracing subscriber setup.
//!
//! Console output goes to stderr; when a log directory is given, a daily
//! rolling file (`parley.log.YYYY-MM-DD`) is written as well. `RUST_LOG`
//! overrides the default filter.

use parley_core::error::{ParleyError, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info,parley=debug";

#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Directory for the rolling log file; console only when `None`.
    pub log_dir: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: Option<String>,
}

/// Installs the global tracing subscriber.
///
/// Keep the returned guard alive for the lifetime of the process, otherwise
/// buffered file output is lost.
pub fn init_tracing(options: LoggingOptions) -> Result<Option<WorkerGuard>> {
    let default_filter = options.default_filter.as_deref().unwrap_or(DEFAULT_FILTER);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| ParleyError::config(format!("invalid log filter: {e}")))?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    let (file_layer, guard) = match options.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(&dir, "parley.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ParleyError::internal(format!("tracing already initialized: {e}")))?;

    tracing::debug!("Tracing initialized");
    Ok(guard)
}
