use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE: &str = "khalorg.log";

/// `<data_local_dir>/khalorg/logs/khalorg.log`
pub fn default_log_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("khalorg")
        .join("logs")
        .join(LOG_FILE)
}

/// Map a level name to a filter directive for khalorg's crates.
///
/// WARNING and CRITICAL are accepted next to tracing's level names.
fn filter_directive(level: &str) -> Result<String> {
    let level = match level.to_lowercase().as_str() {
        "critical" | "error" => "error",
        "warning" | "warn" => "warn",
        "info" => "info",
        "debug" => "debug",
        "trace" => "trace",
        other => anyhow::bail!(
            "Unknown log level '{}'. Use one of: CRITICAL, ERROR, WARNING, INFO, DEBUG",
            other
        ),
    };
    Ok(format!("khalorg={level},khalorg_core={level},warn"))
}

/// Log to stderr and to a daily rolling file. Keep the guard alive until
/// exit so buffered file output is flushed.
pub fn init(level: &str, logfile: &Path) -> Result<WorkerGuard> {
    let directive = filter_directive(level)?;

    let log_dir = logfile.parent().unwrap_or_else(|| Path::new("."));
    let file_name = logfile
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| LOG_FILE.into());
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Could not create log directory {}", log_dir.display()))?;

    let file_appender = rolling::daily(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let terminal_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .with_filter(EnvFilter::new(&directive));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new(&directive));

    tracing_subscriber::registry()
        .with(terminal_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
