//! Configuration for the mod manager.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{ManagerError, ManagerResult};
use crate::conflict::ConflictPolicy;
use crate::package::ModId;

/// File name of the registry document inside the archive directory.
pub const REGISTRY_FILENAME: &str = "mods.json";

/// Default number of concurrent download workflows.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 4;

/// Configuration for the mod manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Directory where mod files are installed.
    ///
    /// Typically the game's `GameData` folder.
    pub install_dir: PathBuf,

    /// Directory holding downloaded archives and the registry document.
    pub archive_dir: PathBuf,

    /// Directory for in-progress downloads.
    pub staging_dir: PathBuf,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Maximum concurrent download and check workflows.
    pub max_concurrent_downloads: usize,

    /// Answer to install conflicts when no human is asked.
    pub conflict_policy: ConflictPolicy,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from("."),
            archive_dir: PathBuf::from("mods"),
            staging_dir: std::env::temp_dir().join("modshelf-staging"),
            timeout: Duration::from_secs(30),
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

impl ManagerConfig {
    /// Create a new configuration with the given install and archive
    /// directories.
    pub fn new(install_dir: PathBuf, archive_dir: PathBuf) -> Self {
        Self {
            install_dir,
            archive_dir,
            ..Default::default()
        }
    }

    /// Set the staging directory.
    pub fn with_staging_dir(mut self, path: PathBuf) -> Self {
        self.staging_dir = path;
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum concurrent downloads (at least one).
    pub fn with_max_concurrent_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = max.max(1);
        self
    }

    /// Set the unattended conflict policy.
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Location of the registry document.
    pub fn registry_path(&self) -> PathBuf {
        self.archive_dir.join(REGISTRY_FILENAME)
    }

    /// Location of a downloaded archive.
    pub fn archive_path(&self, filename: &str) -> PathBuf {
        self.archive_dir.join(filename)
    }

    /// Staging directory for one mod's downloads.
    pub fn staging_path(&self, id: &ModId) -> PathBuf {
        self.staging_dir.join(id.slug())
    }

    /// Name of the install directory, stripped from archive entry paths.
    pub fn install_root_name(&self) -> Option<&str> {
        self.install_dir.file_name().and_then(|name| name.to_str())
    }

    /// Check that the configured directories can be used.
    pub fn validate(&self) -> ManagerResult<()> {
        if self.install_dir.as_os_str().is_empty() {
            return Err(ManagerError::InvalidConfig(
                "install directory is not set".to_string(),
            ));
        }
        if self.install_dir.exists() && !self.install_dir.is_dir() {
            return Err(ManagerError::InvalidConfig(format!(
                "install directory {} is not a directory",
                self.install_dir.display()
            )));
        }
        if is_within(&self.archive_dir, &self.install_dir) {
            return Err(ManagerError::InvalidConfig(format!(
                "archive directory {} must not be inside the install directory",
                self.archive_dir.display()
            )));
        }
        Ok(())
    }
}

fn is_within(path: &Path, dir: &Path) -> bool {
    path != dir && path.starts_with(dir)
}
