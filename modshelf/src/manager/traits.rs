//! Collaborator traits for the mod manager.
//!
//! These traits abstract the parts of the lifecycle that depend on the
//! outside world, so the engine can be driven by real HTTP and zip
//! implementations in production and by in-memory fakes in tests.

use std::path::{Path, PathBuf};

use url::Url;

use super::error::ManagerResult;
use crate::package::ModMetadata;

/// Resolves a mod's web page into metadata for its newest version.
pub trait ModPageResolver: Send + Sync {
    /// Whether the URL looks like a page this resolver understands.
    ///
    /// Checked synchronously before a mod is added.
    fn accepts(&self, url: &Url) -> bool;

    /// Fetch and parse the page.
    fn resolve(&self, url: &Url) -> ManagerResult<ModMetadata>;
}

/// Fetches archive bytes to a local file.
pub trait ArchiveFetcher: Send + Sync {
    /// Download `url` into `dest`, reporting `(bytes_so_far, total)` as it
    /// goes. `total` is `None` when the server does not announce a length.
    ///
    /// Returns the number of bytes written.
    fn fetch(
        &self,
        url: &Url,
        dest: &Path,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> ManagerResult<u64>;
}

/// One file unpacked from a mod archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Destination relative to the install directory.
    pub path: PathBuf,

    /// File contents.
    pub contents: Vec<u8>,
}

/// Unpacks a mod archive into install-relative entries.
pub trait ArchiveExtractor: Send + Sync {
    /// Read every file in the archive.
    ///
    /// When `install_root` is given, the leading path up to and including a
    /// directory with that name is stripped from each entry.
    fn extract(&self, archive: &Path, install_root: Option<&str>)
        -> ManagerResult<Vec<ArchiveEntry>>;
}
