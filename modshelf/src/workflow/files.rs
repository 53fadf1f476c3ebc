//! Filesystem helpers shared by the workflows.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::context::StepContext;
use crate::manager::download::ProgressThrottle;
use crate::manager::{ManagerConfig, ManagerError, ManagerResult};
use crate::package::ModId;
use crate::registry::ModRegistry;

/// Another registered mod whose archive has the given name.
pub(crate) fn archive_user(
    registry: &ModRegistry,
    id: &ModId,
    filename: &str,
) -> ManagerResult<Option<ModId>> {
    Ok(registry
        .get_mods()?
        .into_iter()
        .find(|m| m.id != *id && m.filename() == filename)
        .map(|m| m.id))
}

/// Remove a mod's archive unless another registered mod stores the same
/// file. Returns whether the file was removed.
pub(crate) fn remove_archive(
    config: &ManagerConfig,
    registry: &ModRegistry,
    id: &ModId,
    filename: &str,
) -> ManagerResult<bool> {
    if let Some(other) = archive_user(registry, id, filename)? {
        debug!(filename, other = %other, "Archive still used by another mod");
        return Ok(false);
    }

    let path = config.archive_path(filename);
    match fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ManagerError::WriteFailed { path, source: e }),
    }
}

/// Delete installed files and prune directories left empty.
///
/// `paths` are relative to `install_dir`. Files already gone are skipped.
/// Returns the number of files removed.
pub(crate) fn remove_installed_files(
    install_dir: &Path,
    paths: &[PathBuf],
    ctx: &StepContext<'_>,
) -> ManagerResult<usize> {
    let mut throttle = ProgressThrottle::new();
    let mut removed = 0;

    for (index, relative) in paths.iter().enumerate() {
        let path = install_dir.join(relative);
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Installed file already gone");
            }
            Err(e) => return Err(ManagerError::WriteFailed { path, source: e }),
        }
        prune_empty_parents(install_dir, &path);

        if let Some(fraction) = throttle.update(index as u64 + 1, Some(paths.len() as u64)) {
            ctx.report(format!("Removed {}", relative.display()), fraction);
        }
    }
    Ok(removed)
}

/// Remove empty directories from `path`'s parent up to, not including,
/// `root`.
fn prune_empty_parents(root: &Path, path: &Path) {
    let mut dir = path.parent();
    while let Some(current) = dir {
        if current == root || !current.starts_with(root) {
            break;
        }
        // Fails on non-empty directories, which ends the walk.
        if fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
}

/// Write one installed file, creating parent directories.
pub(crate) fn write_installed_file(path: &Path, contents: &[u8]) -> ManagerResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ManagerError::CreateDirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    fs::write(path, contents).map_err(|e| {
        warn!(path = %path.display(), error = %e, "Failed to write installed file");
        ManagerError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        }
    })
}
