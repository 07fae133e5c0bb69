//! Logging configuration using tracing

use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/calldock/logs/` unless a directory is
/// passed explicitly. Log level is controlled by the `CALLDOCK_LOG`
/// environment variable.
///
/// # Examples
/// ```bash
/// CALLDOCK_LOG=debug calldock
/// CALLDOCK_LOG=calldock_rtc=trace calldock
/// ```
pub fn init(dir_override: Option<&Path>) -> Result<()> {
    let log_dir = match dir_override {
        Some(dir) => dir.to_path_buf(),
        None => default_log_directory(),
    };
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "calldock.log");

    // Default to info, allow override via CALLDOCK_LOG
    let env_filter =
        EnvFilter::try_from_env("CALLDOCK_LOG").unwrap_or_else(|_| EnvFilter::new("calldock=info,call_dock=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("calldock starting");
    tracing::info!("Log directory: {}", log_dir.display());
    tracing::info!("═══════════════════════════════════════════════════════");

    Ok(())
}

/// Get the default log directory path
fn default_log_directory() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("calldock").join("logs")
}

/// Get the log file path for the current day
pub fn current_log_file() -> PathBuf {
    default_log_directory().join("calldock.log")
}
