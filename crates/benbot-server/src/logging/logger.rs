use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

const DEFAULT_FILTER: &str = "info,benbot_server=debug,tower_http=info";

/// Install the global subscriber: stdout plus an optional daily rolling file.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the process.
pub fn init_logger(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    let filter = EnvFilter::try_new(&log_level)?;
    let json = config.format.eq_ignore_ascii_case("json");

    // Empty directory (e.g. APP__LOGGING__DIRECTORY="") disables file output
    let (file_writer, guard) = match config.directory.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(&config.file_prefix)
                .filename_suffix("log")
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    if json {
        // JSON for production
        let stdout = fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true);
        let file = file_writer.map(|writer| {
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .boxed()
        });

        tracing_subscriber::registry()
            .with(filter)
            .with(stdout)
            .with(file)
            .try_init()?;
    } else {
        // Pretty for development
        let stdout = fmt::layer()
            .pretty()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false);
        let file = file_writer.map(|writer| {
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_level(true)
                .with_ansi(false) // No colors in file
                .boxed()
        });

        tracing_subscriber::registry()
            .with(filter)
            .with(stdout)
            .with(file)
            .try_init()?;
    }

    Ok(guard)
}
