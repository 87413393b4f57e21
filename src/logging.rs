//! Tracing subscriber setup
//!
//! Events go to stdout and to a daily rolling file under the configured log
//! directory. Each serving surface writes its own file prefix.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{fmt, EnvFilter};

use crate::settings::LoggingSettings;

/// Which process surface is logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSurface {
    Rest,
    Rpc,
    Combined,
}

impl LogSurface {
    pub fn file_prefix(self) -> &'static str {
        match self {
            LogSurface::Rest => "rest_api",
            LogSurface::Rpc => "rpc_server",
            LogSurface::Combined => "modelhub",
        }
    }
}

/// Filter from `RUST_LOG`, falling back to the configured level
pub fn env_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{level}'")),
    }
}

/// Daily rolling appender for `surface`
pub fn file_appender(settings: &LoggingSettings, surface: LogSurface) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(&settings.directory).with_context(|| {
        format!(
            "Failed to create log directory {}",
            settings.directory.display()
        )
    })?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(surface.file_prefix())
        .filename_suffix("log")
        .max_log_files(settings.max_files.max(1))
        .build(&settings.directory)
        .context("Failed to create log file appender")
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
pub fn init_logging(settings: &LoggingSettings, surface: LogSurface) -> Result<WorkerGuard> {
    let filter = env_filter(&settings.level)?;
    let (writer, guard) = tracing_appender::non_blocking(file_appender(settings, surface)?);

    let stdout_layer = fmt::layer().with_target(false).with_writer(std::io::stdout);

    let (json_layer, text_layer) = if settings.json {
        (
            Some(fmt::layer().json().with_ansi(false).with_writer(writer)),
            None,
        )
    } else {
        (
            None,
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
