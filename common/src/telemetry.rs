use crate::config::LoggingConfig;
use crate::{Error, Result};
pub use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Installs the global subscriber: human-readable stderr output plus a
/// per-stage log file (`<dir>/<stage>.log`, overwritten each run).
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the stage.
pub fn init_tracing(config: &LoggingConfig, stage: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.dir)?;
    let log_file = std::path::Path::new(&config.dir).join(format!("{}.log", stage));
    let _ = std::fs::remove_file(&log_file);

    let file_appender = tracing_appender::rolling::never(&config.dir, format!("{}.log", stage));
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::Other(format!("Invalid log level {}: {}", config.level, e)))?;

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .boxed();

    let file_layer = if config.json {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(non_blocking_file)
            .boxed()
    } else {
        fmt::layer()
            .with_ansi(false)
            .with_writer(non_blocking_file)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to install tracing subscriber: {}", e)))?;

    Ok(guard)
}
