//! Structured logging setup using tracing.

use crate::config::{FileLoggingConfig, LogFormat, LogRotation, LoggingConfig};
use crate::error::RelayError;
use std::fs;
use std::io;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Guard that must be kept alive for the duration of the program.
/// When dropped, flushes and closes the file writer.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the logging system based on configuration.
///
/// A subscriber is always installed, since dropped datagrams are reported
/// regardless of `log_queries`. `RUST_LOG` overrides the `info` default.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard, RelayError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let guard = match (&config.format, &config.file) {
        // Text to stdout only
        (LogFormat::Text, None) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(io::stdout))
                .init();
            None
        }

        // JSON to stdout only
        (LogFormat::Json, None) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(io::stdout))
                .init();
            None
        }

        // Text to stdout + JSON to file
        (LogFormat::Text, Some(file_config)) => {
            let (file_writer, guard) = create_file_writer(file_config)?;
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(io::stdout))
                .with(fmt::layer().json().with_writer(file_writer))
                .init();
            Some(guard)
        }

        // JSON to stdout + JSON to file
        (LogFormat::Json, Some(file_config)) => {
            let (file_writer, guard) = create_file_writer(file_config)?;
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(io::stdout))
                .with(fmt::layer().json().with_writer(file_writer))
                .init();
            Some(guard)
        }
    };

    Ok(LogGuard { _file_guard: guard })
}

fn rotation_for(rotation: &LogRotation) -> Rotation {
    match rotation {
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Never => Rotation::NEVER,
    }
}

fn create_file_writer(config: &FileLoggingConfig) -> Result<(NonBlocking, WorkerGuard), RelayError> {
    fs::create_dir_all(&config.log_dir).map_err(|e| {
        RelayError::Config(format!("cannot create log directory '{}': {}", config.log_dir, e))
    })?;

    let file_appender = RollingFileAppender::new(
        rotation_for(&config.rotation),
        &config.log_dir,
        &config.file_prefix,
    );

    Ok(tracing_appender::non_blocking(file_appender))
}
