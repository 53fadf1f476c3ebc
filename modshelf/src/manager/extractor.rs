//! Zip archive extraction for mod installation.
//!
//! Game mod archives usually wrap their content in a copy of the game's data
//! directory, sometimes under a further top-level folder:
//!
//! ```text
//! foo-1.0.zip
//! ├── README.txt                      skipped
//! └── Foo-1.0/GameData/Foo/part.cfg   ─► Foo/part.cfg
//! ```
//!
//! When any entry contains a directory named like the install directory,
//! everything up to and including that directory is stripped and entries
//! outside it are skipped. Otherwise entries are installed as they are.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use super::error::{ManagerError, ManagerResult};
use super::traits::{ArchiveEntry, ArchiveExtractor};

/// Largest single file accepted from an archive.
const MAX_ENTRY_BYTES: u64 = 2 << 30;

/// Upper bound on the buffer reserved up front for one entry. The declared
/// size comes from the archive and is not trusted beyond this.
const PREALLOC_LIMIT: u64 = 1 << 20;

/// Extractor for `.zip` mod archives.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipExtractor;

impl ZipExtractor {
    /// Create a new zip extractor.
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveExtractor for ZipExtractor {
    fn extract(
        &self,
        archive: &Path,
        install_root: Option<&str>,
    ) -> ManagerResult<Vec<ArchiveEntry>> {
        let extraction_failed = |reason: String| ManagerError::ExtractionFailed {
            path: archive.to_path_buf(),
            reason,
        };

        let file = File::open(archive).map_err(|e| ManagerError::ReadFailed {
            path: archive.to_path_buf(),
            source: e,
        })?;
        let mut zip =
            ZipArchive::new(BufReader::new(file)).map_err(|e| extraction_failed(e.to_string()))?;

        let mut files = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            let mut entry = zip
                .by_index(index)
                .map_err(|e| extraction_failed(e.to_string()))?;
            if entry.is_dir() {
                continue;
            }
            let Some(path) = entry.enclosed_name() else {
                return Err(extraction_failed(format!(
                    "unsafe entry name '{}'",
                    entry.name()
                )));
            };

            let declared = entry.size();
            if declared > MAX_ENTRY_BYTES {
                return Err(extraction_failed(format!(
                    "{} declares {} bytes, more than the {} byte limit",
                    path.display(),
                    declared,
                    MAX_ENTRY_BYTES
                )));
            }

            let mut contents = Vec::with_capacity(declared.min(PREALLOC_LIMIT) as usize);
            entry
                .by_ref()
                .take(MAX_ENTRY_BYTES + 1)
                .read_to_end(&mut contents)
                .map_err(|e: io::Error| extraction_failed(format!("{}: {}", path.display(), e)))?;
            if contents.len() as u64 > MAX_ENTRY_BYTES {
                return Err(extraction_failed(format!(
                    "{} is larger than the {} byte limit",
                    path.display(),
                    MAX_ENTRY_BYTES
                )));
            }
            files.push(ArchiveEntry { path, contents });
        }

        let entries = match install_root {
            Some(root) if files.iter().any(|f| strip_through(&f.path, root).is_some()) => files
                .into_iter()
                .filter_map(|f| {
                    strip_through(&f.path, root).map(|path| ArchiveEntry {
                        path,
                        contents: f.contents,
                    })
                })
                .filter(|f| !f.path.as_os_str().is_empty())
                .collect(),
            _ => files,
        };

        debug!(
            archive = %archive.display(),
            entries = entries.len(),
            "Extracted archive"
        );
        Ok(entries)
    }
}

/// Strip the leading components up to and including the first directory
/// named `root` (case-insensitively). Returns `None` if no directory matches.
fn strip_through(path: &Path, root: &str) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = path.components().collect();
    // The final component is the file itself, never the root directory.
    let dirs = components.len().saturating_sub(1);
    let position = components[..dirs].iter().position(|c| match c {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|name| name.eq_ignore_ascii_case(root)),
        _ => false,
    })?;
    Some(components[position + 1..].iter().collect())
}
