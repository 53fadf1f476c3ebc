//! INI-backed configuration file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use tracing::debug;

use super::error::{ConfigError, ConfigResult};
use super::keys::ConfigKey;
use super::{config_directory, config_file_path};
use crate::conflict::ConflictPolicy;
use crate::manager::download::DEFAULT_TIMEOUT_SECS;
use crate::manager::{ManagerConfig, DEFAULT_MAX_CONCURRENT_DOWNLOADS};

/// `[paths]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSettings {
    /// Game data directory mods are installed into. Must be set by the user.
    pub install_dir: Option<PathBuf>,
    /// Downloaded archives and the registry document.
    pub archive_dir: PathBuf,
    /// Partial downloads.
    pub staging_dir: PathBuf,
}

/// `[downloads]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum concurrent downloads.
    pub concurrent: usize,
}

/// `[updates]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSettings {
    /// Check registered mods for updates before listing them.
    pub check_on_startup: bool,
}

/// `[conflicts]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictSettings {
    /// Answer to install conflicts when nobody is asked.
    pub policy: ConflictPolicy,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Directory for rolling log files.
    pub directory: PathBuf,
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
}

/// The user's configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub paths: PathSettings,
    pub downloads: DownloadSettings,
    pub updates: UpdateSettings,
    pub conflicts: ConflictSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::with_base_dir(&config_directory())
    }
}

impl ConfigFile {
    /// Defaults with every directory under `base`.
    pub fn with_base_dir(base: &Path) -> Self {
        Self {
            paths: PathSettings {
                install_dir: None,
                archive_dir: base.join("archives"),
                staging_dir: base.join("staging"),
            },
            downloads: DownloadSettings {
                timeout_secs: DEFAULT_TIMEOUT_SECS,
                concurrent: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            },
            updates: UpdateSettings {
                check_on_startup: true,
            },
            conflicts: ConflictSettings {
                policy: ConflictPolicy::default(),
            },
            logging: LoggingSettings {
                directory: base.join("logs"),
                level: "info".to_string(),
            },
        }
    }

    /// Load the configuration from the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load the configuration from `path`.
    ///
    /// A missing file yields the defaults; unknown keys are ignored.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let mut config = Self::default();
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(config);
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|section| section.get(key.key_name()));
            if let Some(value) = value {
                key.apply(&mut config, value)?;
            }
        }

        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Save the configuration to the default location.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&config_file_path())
    }

    /// Save the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }

        ini.write_to_file(path).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Build the engine configuration.
    ///
    /// Fails when the install directory has not been configured.
    pub fn to_manager_config(&self) -> ConfigResult<ManagerConfig> {
        let install_dir = self
            .paths
            .install_dir
            .clone()
            .ok_or(ConfigError::InstallDirNotSet)?;

        Ok(
            ManagerConfig::new(install_dir, self.paths.archive_dir.clone())
                .with_staging_dir(self.paths.staging_dir.clone())
                .with_timeout(Duration::from_secs(self.downloads.timeout_secs))
                .with_max_concurrent_downloads(self.downloads.concurrent)
                .with_conflict_policy(self.conflicts.policy),
        )
    }
}

/// Expand a leading `~` to the home directory.
pub(crate) fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix("~/").or_else(|| (value == "~").then_some("")) {
        Some(rest) => match dirs::home_dir() {
            Some(home) if rest.is_empty() => home,
            Some(home) => home.join(rest),
            None => PathBuf::from(value),
        },
        None => PathBuf::from(value),
    }
}
