use crate::errors::{AppError, AppResult};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Sets up daily-rolling JSON file logging. Intended for the embedding
/// application's startup path; calling it twice is an error from `try_init`.
pub fn init(log_dir: &Path) -> AppResult<()> {
    std::fs::create_dir_all(log_dir).map_err(|err| AppError::Io(err.to_string()))?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "journal.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|err| AppError::Internal(err.to_string()))
}
