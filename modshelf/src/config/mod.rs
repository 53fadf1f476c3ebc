//! User configuration file.
//!
//! Settings live in an INI file under the user's home directory:
//!
//! ```text
//! ~/.modshelf/config.ini
//!
//! [paths]
//! install_dir = /games/ksp/GameData
//! archive_dir = ~/.modshelf/archives
//! staging_dir = ~/.modshelf/staging
//!
//! [downloads]
//! timeout = 300
//! concurrent = 4
//!
//! [updates]
//! check_on_startup = true
//!
//! [conflicts]
//! policy = abort
//!
//! [logging]
//! directory = ~/.modshelf/logs
//! level = info
//! ```
//!
//! Missing keys fall back to their defaults. [`ConfigFile::to_manager_config`]
//! turns the file into the [`ManagerConfig`](crate::manager::ManagerConfig)
//! the engine is built from.

mod error;
mod file;
mod keys;

use std::path::PathBuf;

pub use error::{ConfigError, ConfigResult};
pub use file::{
    ConfigFile, ConflictSettings, DownloadSettings, LoggingSettings, PathSettings,
    UpdateSettings,
};
pub use keys::ConfigKey;

/// Name of the per-user application directory.
pub const APP_DIR_NAME: &str = ".modshelf";

/// Name of the configuration file inside the application directory.
pub const CONFIG_FILENAME: &str = "config.ini";

/// The per-user application directory (`~/.modshelf`).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Path of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILENAME)
}
