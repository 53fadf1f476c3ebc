//! Addressable configuration keys.
//!
//! Every setting is named `section.key` so it can be read and written from
//! the command line with `config get` and `config set`.

use std::fmt;
use std::str::FromStr;

use super::error::{ConfigError, ConfigResult};
use super::file::{expand_home, ConfigFile};
use crate::conflict::ConflictPolicy;

/// A single setting in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    PathsInstallDir,
    PathsArchiveDir,
    PathsStagingDir,
    DownloadsTimeout,
    DownloadsConcurrent,
    UpdatesCheckOnStartup,
    ConflictsPolicy,
    LoggingDirectory,
    LoggingLevel,
}

impl ConfigKey {
    /// Every key, grouped by section in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            Self::PathsInstallDir,
            Self::PathsArchiveDir,
            Self::PathsStagingDir,
            Self::DownloadsTimeout,
            Self::DownloadsConcurrent,
            Self::UpdatesCheckOnStartup,
            Self::ConflictsPolicy,
            Self::LoggingDirectory,
            Self::LoggingLevel,
        ]
    }

    /// Full `section.key` name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PathsInstallDir => "paths.install_dir",
            Self::PathsArchiveDir => "paths.archive_dir",
            Self::PathsStagingDir => "paths.staging_dir",
            Self::DownloadsTimeout => "downloads.timeout",
            Self::DownloadsConcurrent => "downloads.concurrent",
            Self::UpdatesCheckOnStartup => "updates.check_on_startup",
            Self::ConflictsPolicy => "conflicts.policy",
            Self::LoggingDirectory => "logging.directory",
            Self::LoggingLevel => "logging.level",
        }
    }

    /// INI section the key lives in.
    pub fn section(&self) -> &'static str {
        self.split().0
    }

    /// Key name within its section.
    pub fn key_name(&self) -> &'static str {
        self.split().1
    }

    fn split(&self) -> (&'static str, &'static str) {
        let name = self.name();
        name.split_once('.').unwrap_or(("", name))
    }

    /// One-line explanation shown by `config list`.
    pub fn description(&self) -> &'static str {
        match self {
            Self::PathsInstallDir => "game directory mods are installed into",
            Self::PathsArchiveDir => "downloaded archives and the mod list",
            Self::PathsStagingDir => "downloads in progress",
            Self::DownloadsTimeout => "seconds before a download is abandoned",
            Self::DownloadsConcurrent => "downloads running at the same time",
            Self::UpdatesCheckOnStartup => "check for updates before listing mods",
            Self::ConflictsPolicy => "what to do when two mods ship the same file",
            Self::LoggingDirectory => "where log files are written",
            Self::LoggingLevel => "log filter, overridden by RUST_LOG",
        }
    }

    /// Accepted values for keys with a fixed set of them.
    pub fn choices(&self) -> Option<Vec<&'static str>> {
        match self {
            Self::ConflictsPolicy => Some(ConflictPolicy::ALL.iter().map(|p| p.name()).collect()),
            Self::UpdatesCheckOnStartup => Some(vec!["true", "false"]),
            _ => None,
        }
    }

    /// Current value as written in the file. Empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            Self::PathsInstallDir => config
                .paths
                .install_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            Self::PathsArchiveDir => config.paths.archive_dir.display().to_string(),
            Self::PathsStagingDir => config.paths.staging_dir.display().to_string(),
            Self::DownloadsTimeout => config.downloads.timeout_secs.to_string(),
            Self::DownloadsConcurrent => config.downloads.concurrent.to_string(),
            Self::UpdatesCheckOnStartup => config.updates.check_on_startup.to_string(),
            Self::ConflictsPolicy => config.conflicts.policy.to_string(),
            Self::LoggingDirectory => config.logging.directory.display().to_string(),
            Self::LoggingLevel => config.logging.level.clone(),
        }
    }

    /// Validate and store a value entered by the user.
    ///
    /// Unlike loading, this checks that a new install directory exists.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> ConfigResult<()> {
        if *self == Self::PathsInstallDir {
            let path = expand_home(value.trim());
            if !path.is_dir() {
                return Err(ConfigError::InvalidInstallDir(path));
            }
        }
        self.apply(config, value)
    }

    /// Parse and store a value read from the file.
    pub fn apply(&self, config: &mut ConfigFile, value: &str) -> ConfigResult<()> {
        let value = value.trim();
        match self {
            Self::PathsInstallDir => {
                config.paths.install_dir = (!value.is_empty()).then(|| expand_home(value));
            }
            Self::PathsArchiveDir => config.paths.archive_dir = self.path(value)?,
            Self::PathsStagingDir => config.paths.staging_dir = self.path(value)?,
            Self::DownloadsTimeout => {
                config.downloads.timeout_secs = self.number(value)?;
            }
            Self::DownloadsConcurrent => {
                config.downloads.concurrent = self.number(value)? as usize;
            }
            Self::UpdatesCheckOnStartup => {
                config.updates.check_on_startup = self.flag(value)?;
            }
            Self::ConflictsPolicy => {
                config.conflicts.policy = value
                    .parse::<ConflictPolicy>()
                    .map_err(|e| self.invalid(value, e.to_string()))?;
            }
            Self::LoggingDirectory => config.logging.directory = self.path(value)?,
            Self::LoggingLevel => {
                if value.is_empty() {
                    return Err(self.invalid(value, "must not be empty"));
                }
                config.logging.level = value.to_string();
            }
        }
        Ok(())
    }

    fn path(&self, value: &str) -> ConfigResult<std::path::PathBuf> {
        if value.is_empty() {
            return Err(self.invalid(value, "must not be empty"));
        }
        Ok(expand_home(value))
    }

    fn number(&self, value: &str) -> ConfigResult<u64> {
        match value.parse::<u64>() {
            Ok(0) => Err(self.invalid(value, "must be at least 1")),
            Ok(n) => Ok(n),
            Err(e) => Err(self.invalid(value, e.to_string())),
        }
    }

    fn flag(&self, value: &str) -> ConfigResult<bool> {
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(self.invalid(value, "expected true or false")),
        }
    }

    fn invalid(&self, value: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name().to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_parse_key_names() {
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), *key);
            assert_eq!(format!("{}.{}", key.section(), key.key_name()), key.name());
        }
        assert!(matches!(
            "paths.nope".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_set_and_get() {
        let temp = TempDir::new().unwrap();
        let mut config = ConfigFile::with_base_dir(temp.path());

        ConfigKey::DownloadsConcurrent.set(&mut config, "6").unwrap();
        ConfigKey::ConflictsPolicy.set(&mut config, "Overwrite").unwrap();
        ConfigKey::UpdatesCheckOnStartup.set(&mut config, "no").unwrap();

        assert_eq!(ConfigKey::DownloadsConcurrent.get(&config), "6");
        assert_eq!(ConfigKey::ConflictsPolicy.get(&config), "overwrite");
        assert_eq!(ConfigKey::UpdatesCheckOnStartup.get(&config), "false");
        assert_eq!(ConfigKey::PathsInstallDir.get(&config), "");
    }

    #[test]
    fn test_choices_are_accepted_values() {
        let mut config = ConfigFile::default();
        for key in ConfigKey::all() {
            for choice in key.choices().unwrap_or_default() {
                key.set(&mut config, choice).unwrap();
                assert_eq!(key.get(&config), choice);
            }
        }
        assert_eq!(
            ConfigKey::ConflictsPolicy.choices(),
            Some(vec!["ask", "overwrite", "keep", "abort"])
        );
        assert_eq!(ConfigKey::DownloadsTimeout.choices(), None);
    }

    #[test]
    fn test_concurrent_downloads_must_be_positive() {
        let mut config = ConfigFile::default();
        assert!(matches!(
            ConfigKey::DownloadsConcurrent.set(&mut config, "0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(ConfigKey::DownloadsConcurrent.set(&mut config, "many").is_err());
    }

    #[test]
    fn test_install_dir_must_exist() {
        let temp = TempDir::new().unwrap();
        let mut config = ConfigFile::with_base_dir(temp.path());
        let missing = temp.path().join("missing");

        assert!(matches!(
            ConfigKey::PathsInstallDir.set(&mut config, &missing.display().to_string()),
            Err(ConfigError::InvalidInstallDir(path)) if path == missing
        ));

        let game_data = temp.path().join("GameData");
        std::fs::create_dir(&game_data).unwrap();
        ConfigKey::PathsInstallDir
            .set(&mut config, &game_data.display().to_string())
            .unwrap();
        assert_eq!(config.paths.install_dir, Some(game_data));
    }

    #[test]
    fn test_apply_does_not_check_install_dir() {
        let mut config = ConfigFile::default();
        ConfigKey::PathsInstallDir
            .apply(&mut config, "/does/not/exist")
            .unwrap();
        assert_eq!(
            config.paths.install_dir,
            Some(PathBuf::from("/does/not/exist"))
        );
    }
}
