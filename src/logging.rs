//! Logging setup: stdout plus an optional daily rolling file

use std::path::Path;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Could not create log directory: {0}")]
    LogDir(#[from] std::io::Error),
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber.
///
/// Filter comes from `RUST_LOG`, defaulting to `docwatch=info`. With a
/// `log_dir`, logs are also written to `docwatch.log` there; keep the returned
/// guard alive for as long as file logging should keep flushing.
pub fn init_logging(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, LoggingError> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(rolling::daily(dir, "docwatch.log"));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "docwatch=info,docwatch_lib=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer()) // stdout
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
