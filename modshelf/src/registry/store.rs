//! Persisted registry of managed mods.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{RegistryError, RegistryResult};
use super::ownership::{ClaimKind, FileClaim, FileClaims};
use crate::package::{Mod, ModId};

/// On-disk registry document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDocument {
    /// Known mods in insertion order.
    #[serde(default)]
    pub mods: Vec<Mod>,

    /// Ownership of installed paths.
    #[serde(default)]
    pub files: FileClaims,
}

impl RegistryDocument {
    fn position(&self, id: &ModId) -> Option<usize> {
        self.mods.iter().position(|m| m.id == *id)
    }

    fn get_mut(&mut self, id: &ModId) -> RegistryResult<&mut Mod> {
        self.mods
            .iter_mut()
            .find(|m| m.id == *id)
            .ok_or_else(|| RegistryError::UnknownMod(id.clone()))
    }

    fn contains(&self, id: &ModId) -> bool {
        self.position(id).is_some()
    }
}

/// The durable list of known mods and the files they own.
///
/// The registry is the single source of truth for install state:
///
/// - **Lazy load**: the document is read on first access; a missing file is
///   an empty registry.
/// - **Write-through**: every mutation is persisted before it returns, by
///   writing a temporary file and renaming it over the document.
/// - **Snapshot reads**: readers clone from the last committed state and
///   never observe a half-applied mutation. Writers are serialized; a failed
///   persist leaves both memory and disk at the previous state.
///
/// # Example
///
/// ```ignore
/// let registry = ModRegistry::open(config.registry_path());
/// registry.add_or_update(entry)?;
/// assert!(registry.get(&id)?.is_some());
/// ```
#[derive(Debug)]
pub struct ModRegistry {
    path: PathBuf,
    state: RwLock<Option<Arc<RegistryDocument>>>,
    write_lock: Mutex<()>,
}

impl ModRegistry {
    /// Open the registry stored at `path`.
    ///
    /// Nothing is read until the first access.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(None),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the registry document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of all known mods.
    pub fn get_mods(&self) -> RegistryResult<Vec<Mod>> {
        Ok(self.snapshot()?.mods.clone())
    }

    /// Look up a mod by id.
    pub fn get(&self, id: &ModId) -> RegistryResult<Option<Mod>> {
        Ok(self.snapshot()?.mods.iter().find(|m| m.id == *id).cloned())
    }

    /// Check whether a mod is registered.
    pub fn contains(&self, id: &ModId) -> RegistryResult<bool> {
        Ok(self.snapshot()?.contains(id))
    }

    /// Snapshot of the file ownership records.
    pub fn claims(&self) -> RegistryResult<FileClaims> {
        Ok(self.snapshot()?.files.clone())
    }

    /// Mod whose bytes are on disk at an install-relative path.
    pub fn owner_of(&self, path: &Path) -> RegistryResult<Option<ModId>> {
        Ok(self
            .snapshot()?
            .files
            .owner_of(path)
            .map(|record| record.owner.clone()))
    }

    /// Paths the mod owns or shares.
    pub fn files_owned_by(&self, id: &ModId) -> RegistryResult<Vec<PathBuf>> {
        Ok(self.snapshot()?.files.paths_claimed_by(id))
    }

    /// Insert a mod, or replace the entry with the same id.
    pub fn add_or_update(&self, entry: Mod) -> RegistryResult<()> {
        self.mutate(|doc| {
            match doc.position(&entry.id) {
                Some(index) => doc.mods[index] = entry,
                None => doc.mods.push(entry),
            }
            Ok(())
        })
    }

    /// Remove a mod and release its file claims.
    ///
    /// Returns the removed entry, or `None` if it was not registered.
    pub fn remove(&self, id: &ModId) -> RegistryResult<Option<Mod>> {
        if !self.contains(id)? {
            return Ok(None);
        }
        self.mutate(|doc| {
            let removed = doc.position(id).map(|index| doc.mods.remove(index));
            doc.files.release(id);
            Ok(removed)
        })
    }

    /// Forget every mod and ownership record.
    pub fn clear(&self) -> RegistryResult<()> {
        self.mutate(|doc| {
            *doc = RegistryDocument::default();
            Ok(())
        })
    }

    /// Set the transient update-available flag.
    ///
    /// The flag is not persisted, so only the in-memory state changes.
    pub fn set_update_available(&self, id: &ModId, available: bool) -> RegistryResult<Mod> {
        let _guard = self.write_lock.lock();
        let mut next = (*self.snapshot()?).clone();
        let entry = next.get_mut(id)?;
        entry.update_available = available;
        let updated = entry.clone();
        *self.state.write() = Some(Arc::new(next));
        Ok(updated)
    }

    /// Mark a mod enabled and record the paths it installed.
    pub fn commit_enable(&self, id: &ModId, claims: &[FileClaim]) -> RegistryResult<Mod> {
        self.mutate(|doc| {
            for claim in claims {
                match claim.kind {
                    ClaimKind::Own => doc.files.take_ownership(claim.path.clone(), id),
                    ClaimKind::Share => {
                        doc.files.share(&claim.path, id);
                    }
                }
            }
            let known: Vec<ModId> = doc.mods.iter().map(|m| m.id.clone()).collect();
            doc.files.validate(claims.iter().map(|c| c.path.as_path()), |candidate| {
                known.contains(candidate)
            })?;

            let entry = doc.get_mut(id)?;
            entry.enabled = true;
            Ok(entry.clone())
        })
    }

    /// Mark a mod disabled and release its file claims.
    pub fn commit_disable(&self, id: &ModId) -> RegistryResult<Mod> {
        self.mutate(|doc| {
            doc.files.release(id);
            let entry = doc.get_mut(id)?;
            entry.enabled = false;
            Ok(entry.clone())
        })
    }

    /// Apply a mutation to a copy of the current state, persist it, then
    /// publish it to readers.
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut RegistryDocument) -> RegistryResult<T>,
    ) -> RegistryResult<T> {
        let _guard = self.write_lock.lock();
        let mut next = (*self.snapshot()?).clone();
        let result = apply(&mut next)?;
        self.persist(&next)?;
        *self.state.write() = Some(Arc::new(next));
        Ok(result)
    }

    fn snapshot(&self) -> RegistryResult<Arc<RegistryDocument>> {
        if let Some(doc) = self.state.read().as_ref() {
            return Ok(Arc::clone(doc));
        }

        let mut state = self.state.write();
        if let Some(doc) = state.as_ref() {
            return Ok(Arc::clone(doc));
        }
        let doc = Arc::new(self.load()?);
        *state = Some(Arc::clone(&doc));
        Ok(doc)
    }

    fn load(&self) -> RegistryResult<RegistryDocument> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No registry yet, starting empty");
                return Ok(RegistryDocument::default());
            }
            Err(e) => {
                return Err(RegistryError::ReadFailed {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        let doc: RegistryDocument =
            serde_json::from_slice(&bytes).map_err(|e| RegistryError::Corrupt {
                path: self.path.clone(),
                source: e,
            })?;
        info!(
            path = %self.path.display(),
            mods = doc.mods.len(),
            files = doc.files.len(),
            "Loaded mod registry"
        );
        Ok(doc)
    }

    fn persist(&self, doc: &RegistryDocument) -> RegistryResult<()> {
        let write_failed = |source: io::Error| RegistryError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        let file = File::create(&temp_path).map_err(write_failed)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, doc).map_err(RegistryError::Serialize)?;
        writer.flush().map_err(write_failed)?;
        writer
            .into_inner()
            .map_err(|e| write_failed(e.into_error()))?
            .sync_all()
            .map_err(write_failed)?;

        fs::rename(&temp_path, &self.path).map_err(write_failed)?;
        debug!(path = %self.path.display(), mods = doc.mods.len(), "Persisted mod registry");
        Ok(())
    }
}
