//! Staging directory handling.
//!
//! Downloads land in a per-mod staging directory and are moved into the
//! archive directory once complete. Cancelled or failed downloads leave
//! their partial files behind; [`purge_staging`] removes them.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use super::error::{ManagerError, ManagerResult};

/// Move a completed download into its final location.
///
/// Falls back to copy-and-remove when the staging and archive directories
/// are on different filesystems.
pub fn move_into_place(staged: &Path, dest: &Path) -> ManagerResult<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ManagerError::CreateDirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    match fs::rename(staged, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(
                staged = %staged.display(),
                dest = %dest.display(),
                error = %e,
                "Rename failed, copying instead"
            );
            let temp = dest.with_extension("partial");
            fs::copy(staged, &temp).map_err(|e| ManagerError::WriteFailed {
                path: temp.clone(),
                source: e,
            })?;
            fs::rename(&temp, dest).map_err(|e| ManagerError::WriteFailed {
                path: dest.to_path_buf(),
                source: e,
            })?;
            // The archive is in place; a leftover staged copy is purged later.
            let _ = fs::remove_file(staged);
            Ok(())
        }
    }
}

/// Remove staging directories not listed in `keep`.
///
/// Returns the number of entries removed. A missing staging directory is
/// not an error.
pub fn purge_staging(staging_dir: &Path, keep: &HashSet<String>) -> ManagerResult<usize> {
    let entries = match fs::read_dir(staging_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(ManagerError::ReadFailed {
                path: staging_dir.to_path_buf(),
                source: e,
            })
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if keep.contains(&name) {
            debug!(entry = %name, "Keeping staging entry of running workflow");
            continue;
        }

        let path = entry.path();
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staging entry"),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_move_into_place_creates_parent() {
        let temp = TempDir::new().unwrap();
        let staged = temp.path().join("staging").join("foo.zip");
        fs::create_dir_all(staged.parent().unwrap()).unwrap();
        fs::write(&staged, b"zip").unwrap();
        let dest = temp.path().join("archives").join("foo.zip");

        move_into_place(&staged, &dest).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"zip");
        assert!(!staged.exists());
    }

    #[test]
    fn test_move_into_place_replaces_existing() {
        let temp = TempDir::new().unwrap();
        let staged = temp.path().join("new.zip");
        let dest = temp.path().join("foo.zip");
        fs::write(&staged, b"new").unwrap();
        fs::write(&dest, b"old").unwrap();

        move_into_place(&staged, &dest).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }

    #[test]
    fn test_purge_keeps_listed_entries() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("running")).unwrap();
        fs::create_dir_all(temp.path().join("stale")).unwrap();
        fs::write(temp.path().join("stale").join("foo.zip"), b"partial").unwrap();
        fs::write(temp.path().join("orphan.part"), b"partial").unwrap();

        let keep = HashSet::from(["running".to_string()]);
        let removed = purge_staging(temp.path(), &keep).unwrap();

        assert_eq!(removed, 2);
        assert!(temp.path().join("running").exists());
        assert!(!temp.path().join("stale").exists());
    }

    #[test]
    fn test_purge_missing_dir() {
        let temp = TempDir::new().unwrap();
        let removed = purge_staging(&temp.path().join("none"), &HashSet::new()).unwrap();
        assert_eq!(removed, 0);
    }
}
