//! Configuration file errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors reading, writing or editing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("install directory {0} does not exist or is not a directory")]
    InvalidInstallDir(PathBuf),

    #[error("install directory is not set; run `modshelf config set paths.install_dir <dir>`")]
    InstallDirNotSet,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
