//! Tracing subscriber setup.
//!
//! Log records go to a daily-rolling file through a non-blocking writer, and
//! optionally to stderr:
//!
//! ```text
//! tracing macros ──► EnvFilter ──┬──► fmt layer ──► non-blocking ──► logs/modshelf.YYYY-MM-DD.log
//!                                └──► fmt layer ──► stderr (optional)
//! ```
//!
//! `RUST_LOG` overrides the configured level.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default log file prefix.
pub const DEFAULT_LOG_PREFIX: &str = "modshelf";

/// Errors installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("invalid log filter '{0}'")]
    Filter(String),

    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Logging settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for the rolling log files.
    pub directory: PathBuf,
    /// File name prefix.
    pub file_prefix: String,
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Also write human-readable records to stderr.
    pub stderr: bool,
}

impl LoggingConfig {
    /// Log to `directory` at `info` level.
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            file_prefix: DEFAULT_LOG_PREFIX.to_string(),
            level: "info".to_string(),
            stderr: false,
        }
    }

    /// Set the default filter directive.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Enable or disable the stderr layer.
    pub fn with_stderr(mut self, stderr: bool) -> Self {
        self.stderr = stderr;
        self
    }
}

/// Keeps the background log writer alive.
///
/// Buffered records are flushed when the guard is dropped, so hold it for
/// the lifetime of the process.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _writer: WorkerGuard,
}

/// Install the global tracing subscriber.
pub fn init_logging(config: LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    fs::create_dir_all(&config.directory).map_err(|e| LoggingError::CreateDir {
        path: config.directory.clone(),
        source: e,
    })?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|_| LoggingError::Filter(config.level.clone()))?,
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .build(&config.directory)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    let stderr_layer = config
        .stderr
        .then(|| fmt::layer().with_writer(io::stderr).with_target(false).compact());

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)?;

    Ok(LoggingGuard { _writer: guard })
}
