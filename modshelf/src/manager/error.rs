//! Error types for the mod manager.

use std::io;
use std::path::PathBuf;

use crate::package::ModId;
use crate::registry::RegistryError;

/// Result type for manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors that can occur during mod management operations.
#[derive(Debug)]
pub enum ManagerError {
    /// Failed to read a file or directory.
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file or directory.
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// The URL is not a recognized mod page.
    CannotAddMod { url: String },

    /// The mod is not in the registry.
    ModNotFound(ModId),

    /// The mod's files are already installed.
    ModAlreadyEnabled(ModId),

    /// The mod's files are not installed.
    ModAlreadyDisabled(ModId),

    /// The mod's archive is not in the archive directory.
    ModNotDownloaded { id: ModId, archive: PathBuf },

    /// Another workflow for the mod is queued or running.
    WorkflowInFlight(ModId),

    /// Failed to fetch mod metadata.
    MetadataFetchFailed { url: String, reason: String },

    /// Failed to parse mod metadata.
    MetadataParseFailed { url: String, reason: String },

    /// Another registered mod stores its archive under the same name.
    ArchiveNameTaken { filename: String, owner: ModId },

    /// Failed to download a mod archive.
    DownloadFailed { url: String, reason: String },

    /// Network timeout.
    Timeout { url: String, timeout_secs: u64 },

    /// Archive extraction failed.
    ExtractionFailed { path: PathBuf, reason: String },

    /// A conflict was resolved by aborting the install.
    ConflictAborted { path: PathBuf },

    /// File ownership records are inconsistent.
    OwnershipInvariant { path: PathBuf, reason: String },

    /// Registry access failed.
    Registry(RegistryError),

    /// Invalid configuration.
    InvalidConfig(String),

    /// The manager was created outside a Tokio runtime.
    NoRuntime,

    /// The worker pool has shut down.
    PoolClosed(&'static str),
}

impl ManagerError {
    /// Whether the error is a precondition rejected before any work starts.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::CannotAddMod { .. }
                | Self::ModNotFound(_)
                | Self::ModAlreadyEnabled(_)
                | Self::ModAlreadyDisabled(_)
                | Self::ModNotDownloaded { .. }
                | Self::WorkflowInFlight(_)
        )
    }
}

impl std::fmt::Display for ManagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            Self::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            Self::CreateDirFailed { path, source } => {
                write!(
                    f,
                    "failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::CannotAddMod { url } => {
                write!(f, "cannot add mod: {} is not a recognized mod page", url)
            }
            Self::ModNotFound(id) => write!(f, "mod not found: {}", id),
            Self::ModAlreadyEnabled(id) => write!(f, "mod {} is already enabled", id),
            Self::ModAlreadyDisabled(id) => write!(f, "mod {} is already disabled", id),
            Self::ModNotDownloaded { id, archive } => {
                write!(
                    f,
                    "mod {} is not downloaded ({} is missing)",
                    id,
                    archive.display()
                )
            }
            Self::WorkflowInFlight(id) => {
                write!(f, "mod {} already has a workflow in progress", id)
            }
            Self::MetadataFetchFailed { url, reason } => {
                write!(f, "failed to fetch mod metadata from {}: {}", url, reason)
            }
            Self::MetadataParseFailed { url, reason } => {
                write!(f, "failed to parse mod metadata from {}: {}", url, reason)
            }
            Self::ArchiveNameTaken { filename, owner } => {
                write!(f, "archive name {} is already used by mod {}", filename, owner)
            }
            Self::DownloadFailed { url, reason } => {
                write!(f, "failed to download {}: {}", url, reason)
            }
            Self::Timeout { url, timeout_secs } => {
                write!(f, "request to {} timed out after {}s", url, timeout_secs)
            }
            Self::ExtractionFailed { path, reason } => {
                write!(f, "failed to extract {}: {}", path.display(), reason)
            }
            Self::ConflictAborted { path } => {
                write!(f, "install aborted at conflicting file {}", path.display())
            }
            Self::OwnershipInvariant { path, reason } => {
                write!(
                    f,
                    "inconsistent ownership of {}: {}",
                    path.display(),
                    reason
                )
            }
            Self::Registry(e) => write!(f, "registry error: {}", e),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            Self::NoRuntime => write!(f, "mod manager requires a Tokio runtime"),
            Self::PoolClosed(pool) => write!(f, "{} pool has shut down", pool),
        }
    }
}

impl std::error::Error for ManagerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFailed { source, .. } => Some(source),
            Self::WriteFailed { source, .. } => Some(source),
            Self::CreateDirFailed { source, .. } => Some(source),
            Self::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RegistryError> for ManagerError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::Ownership { path, reason } => Self::OwnershipInvariant { path, reason },
            RegistryError::UnknownMod(id) => Self::ModNotFound(id),
            other => Self::Registry(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ManagerError::ModAlreadyEnabled(ModId::new("example.com/foo"));
        assert_eq!(err.to_string(), "mod example.com/foo is already enabled");
    }

    #[test]
    fn test_preconditions_are_classified() {
        let id = ModId::new("example.com/foo");
        assert!(ManagerError::ModAlreadyDisabled(id.clone()).is_precondition());
        assert!(ManagerError::WorkflowInFlight(id.clone()).is_precondition());
        assert!(ManagerError::ModNotDownloaded {
            id,
            archive: PathBuf::from("foo.zip"),
        }
        .is_precondition());

        assert!(!ManagerError::ConflictAborted {
            path: PathBuf::from("a.cfg"),
        }
        .is_precondition());
        assert!(!ManagerError::DownloadFailed {
            url: "https://example.com".to_string(),
            reason: "404".to_string(),
        }
        .is_precondition());
    }

    #[test]
    fn test_ownership_registry_error_maps_to_invariant() {
        let err: ManagerError = RegistryError::Ownership {
            path: PathBuf::from("a.cfg"),
            reason: "bad".to_string(),
        }
        .into();
        assert!(matches!(err, ManagerError::OwnershipInvariant { .. }));
        assert!(err.to_string().contains("a.cfg"));
    }
}
