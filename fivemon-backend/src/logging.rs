//! Logging setup: compact stdout plus an optional plain-text log file.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Name of the log file inside the log directory
pub const LOG_FILE_NAME: &str = "fivem-monitor.log";

#[cfg(debug_assertions)]
const DEFAULT_LEVEL: &str = "debug";
#[cfg(not(debug_assertions))]
const DEFAULT_LEVEL: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

/// Open `<log_dir>/fivem-monitor.log` for appending, creating the directory.
pub fn file_appender(log_dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("fivem-monitor")
        .filename_suffix("log")
        .build(log_dir)
}

/// Install the global subscriber.
///
/// Both outputs share the `RUST_LOG` filter. The returned guard flushes the
/// file writer on drop and must live as long as the program.
pub fn init(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, InitError> {
    let stdout = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(env_filter());

    let Some(log_dir) = log_dir else {
        tracing_subscriber::registry().with(stdout).init();
        return Ok(None);
    };

    let (writer, guard) = tracing_appender::non_blocking(file_appender(log_dir)?);
    tracing_subscriber::registry()
        .with(stdout)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_filter(env_filter()),
        )
        .init();
    Ok(Some(guard))
}
