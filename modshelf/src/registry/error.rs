//! Error types for the mod registry.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::package::ModId;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur while loading, querying or persisting the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry document could not be read.
    #[error("failed to read registry {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// The registry document could not be written.
    #[error("failed to write registry {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// The registry document exists but is not valid.
    #[error("registry {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The registry could not be serialized.
    #[error("failed to serialize registry: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The referenced mod is not registered.
    #[error("mod {0} is not registered")]
    UnknownMod(ModId),

    /// The file ownership records are inconsistent.
    #[error("inconsistent ownership of {}: {reason}", path.display())]
    Ownership { path: PathBuf, reason: String },
}
