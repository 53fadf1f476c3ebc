//! Single-flight tracking of workflows per mod, and of the archive file
//! names their downloads are about to store.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::{ManagerError, ManagerResult};
use crate::package::ModId;

/// Set of mods with a queued or running workflow.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    mods: Arc<Mutex<HashSet<ModId>>>,
}

impl InFlight {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the mod for a new workflow.
    ///
    /// The claim is released when the returned guard is dropped.
    pub fn try_acquire(&self, id: &ModId) -> ManagerResult<InFlightGuard> {
        if !self.mods.lock().insert(id.clone()) {
            return Err(ManagerError::WorkflowInFlight(id.clone()));
        }
        Ok(InFlightGuard {
            mods: Arc::clone(&self.mods),
            id: id.clone(),
        })
    }

    /// Whether the mod has a workflow in progress.
    pub fn contains(&self, id: &ModId) -> bool {
        self.mods.lock().contains(id)
    }

    /// Mods with a workflow in progress.
    pub fn snapshot(&self) -> Vec<ModId> {
        self.mods.lock().iter().cloned().collect()
    }
}

/// Claim on a mod held for the lifetime of its workflow.
#[derive(Debug)]
pub struct InFlightGuard {
    mods: Arc<Mutex<HashSet<ModId>>>,
    id: ModId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.mods.lock().remove(&self.id);
    }
}

/// Archive file names claimed by downloads that have not finished yet.
///
/// A name is reserved before the registry is checked for other users, so
/// two downloads racing to store the same file cannot both pass the check.
#[derive(Debug, Clone, Default)]
pub struct ArchiveNames {
    names: Arc<Mutex<HashMap<String, ModId>>>,
}

impl ArchiveNames {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `filename` for the mod's download.
    ///
    /// Fails with [`ManagerError::ArchiveNameTaken`] while another mod holds
    /// the name. The reservation is released when the guard is dropped.
    pub fn try_reserve(&self, filename: &str, id: &ModId) -> ManagerResult<ArchiveReservation> {
        match self.names.lock().entry(filename.to_string()) {
            Entry::Occupied(held) if held.get() != id => {
                return Err(ManagerError::ArchiveNameTaken {
                    filename: filename.to_string(),
                    owner: held.get().clone(),
                });
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(id.clone());
            }
        }
        Ok(ArchiveReservation {
            names: Arc::clone(&self.names),
            filename: filename.to_string(),
            id: id.clone(),
        })
    }

    /// Mod currently holding `filename`, if any.
    pub fn holder(&self, filename: &str) -> Option<ModId> {
        self.names.lock().get(filename).cloned()
    }
}

/// Claim on an archive file name held until the download ends.
#[derive(Debug)]
pub struct ArchiveReservation {
    names: Arc<Mutex<HashMap<String, ModId>>>,
    filename: String,
    id: ModId,
}

impl ArchiveReservation {
    /// The reserved file name.
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl Drop for ArchiveReservation {
    fn drop(&mut self) {
        let mut names = self.names.lock();
        if names.get(&self.filename) == Some(&self.id) {
            names.remove(&self.filename);
        }
    }
}
