//! Per-file ownership of installed mod files.
//!
//! Every path a mod installs is recorded against the mod whose bytes are on
//! disk (the owner). Other enabled mods that ship the same path, either with
//! identical contents or because the user chose to keep the existing file,
//! are recorded as sharers. A file is only removed from disk once no mod
//! claims it any more.
//!
//! ```text
//! GameData/ModuleManager.dll ─► owner: foo   shared_with: {bar}
//! GameData/Foo/part.cfg      ─► owner: foo
//! ```
//!
//! Disabling `foo` removes `Foo/part.cfg` and hands `ModuleManager.dll` over
//! to `bar`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{RegistryError, RegistryResult};
use crate::package::ModId;

/// How a mod claims an installed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimKind {
    /// The mod's bytes are written to the path.
    Own,
    /// The mod relies on the bytes another mod installed.
    Share,
}

/// A path claimed by a mod during an enable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileClaim {
    /// Path relative to the install directory.
    pub path: PathBuf,
    /// Kind of claim.
    pub kind: ClaimKind,
}

impl FileClaim {
    /// Claim a path as its owner.
    pub fn own(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ClaimKind::Own,
        }
    }

    /// Claim a path as a sharer.
    pub fn share(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ClaimKind::Share,
        }
    }
}

/// Ownership record for one installed path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOwner {
    /// Mod whose bytes are on disk.
    pub owner: ModId,

    /// Other enabled mods that also need the path.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub shared_with: BTreeSet<ModId>,
}

impl FileOwner {
    /// Create a record with a single owner.
    pub fn new(owner: ModId) -> Self {
        Self {
            owner,
            shared_with: BTreeSet::new(),
        }
    }

    /// Check whether the mod claims this path in any way.
    pub fn is_claimed_by(&self, id: &ModId) -> bool {
        self.owner == *id || self.shared_with.contains(id)
    }
}

/// Ownership records for every installed path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileClaims(BTreeMap<PathBuf, FileOwner>);

impl FileClaims {
    /// Create an empty set of records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked paths.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no paths are tracked.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ownership record for a path.
    pub fn owner_of(&self, path: &Path) -> Option<&FileOwner> {
        self.0.get(path)
    }

    /// All paths the mod owns or shares.
    pub fn paths_claimed_by(&self, id: &ModId) -> Vec<PathBuf> {
        self.0
            .iter()
            .filter(|(_, record)| record.is_claimed_by(id))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Record that the mod's bytes now occupy the path.
    ///
    /// A previous owner keeps a share in the path.
    pub fn take_ownership(&mut self, path: PathBuf, id: &ModId) {
        match self.0.get_mut(&path) {
            Some(record) if record.owner != *id => {
                let previous = std::mem::replace(&mut record.owner, id.clone());
                record.shared_with.remove(id);
                record.shared_with.insert(previous);
            }
            Some(_) => {}
            None => {
                self.0.insert(path, FileOwner::new(id.clone()));
            }
        }
    }

    /// Record that the mod relies on bytes another mod installed.
    ///
    /// Returns `false` if the path is not tracked.
    pub fn share(&mut self, path: &Path, id: &ModId) -> bool {
        match self.0.get_mut(path) {
            Some(record) => {
                if record.owner != *id {
                    record.shared_with.insert(id.clone());
                }
                true
            }
            None => false,
        }
    }

    /// Paths that would become unclaimed if the mod released its claims.
    pub fn orphaned_by(&self, id: &ModId) -> Vec<PathBuf> {
        self.0
            .iter()
            .filter(|(_, record)| record.owner == *id && record.shared_with.is_empty())
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Drop every claim the mod holds.
    ///
    /// Paths the mod owned pass to the first remaining sharer. Returns the
    /// paths nobody claims any more, which should be removed from disk.
    pub fn release(&mut self, id: &ModId) -> Vec<PathBuf> {
        let mut orphaned = Vec::new();
        self.0.retain(|path, record| {
            if record.owner == *id {
                match record.shared_with.pop_first() {
                    Some(next) => {
                        record.owner = next;
                        true
                    }
                    None => {
                        orphaned.push(path.clone());
                        false
                    }
                }
            } else {
                record.shared_with.remove(id);
                true
            }
        });
        orphaned
    }

    /// Check the records for the given paths.
    ///
    /// `is_known` reports whether a mod id is registered.
    pub fn validate<'a>(
        &self,
        paths: impl IntoIterator<Item = &'a Path>,
        is_known: impl Fn(&ModId) -> bool,
    ) -> RegistryResult<()> {
        for path in paths {
            let Some(record) = self.0.get(path) else {
                continue;
            };
            if record.shared_with.contains(&record.owner) {
                return Err(RegistryError::Ownership {
                    path: path.to_path_buf(),
                    reason: format!("{} is recorded as both owner and sharer", record.owner),
                });
            }
            if let Some(unknown) = std::iter::once(&record.owner)
                .chain(record.shared_with.iter())
                .find(|id| !is_known(id))
            {
                return Err(RegistryError::Ownership {
                    path: path.to_path_buf(),
                    reason: format!("claimed by unregistered mod {}", unknown),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foo() -> ModId {
        ModId::new("example.com/foo")
    }

    fn bar() -> ModId {
        ModId::new("example.com/bar")
    }

    #[test]
    fn test_take_ownership_of_new_path() {
        let mut claims = FileClaims::new();
        claims.take_ownership(PathBuf::from("Foo/a.cfg"), &foo());

        let record = claims.owner_of(Path::new("Foo/a.cfg")).unwrap();
        assert_eq!(record.owner, foo());
        assert!(record.shared_with.is_empty());
    }

    #[test]
    fn test_overwrite_keeps_previous_owner_as_sharer() {
        let mut claims = FileClaims::new();
        claims.take_ownership(PathBuf::from("shared.dll"), &foo());
        claims.take_ownership(PathBuf::from("shared.dll"), &bar());

        let record = claims.owner_of(Path::new("shared.dll")).unwrap();
        assert_eq!(record.owner, bar());
        assert!(record.shared_with.contains(&foo()));
    }

    #[test]
    fn test_share_untracked_path_is_refused() {
        let mut claims = FileClaims::new();
        assert!(!claims.share(Path::new("stock.cfg"), &foo()));
        assert!(claims.is_empty());
    }

    #[test]
    fn test_release_keeps_paths_still_shared() {
        let mut claims = FileClaims::new();
        claims.take_ownership(PathBuf::from("Foo/a.cfg"), &foo());
        claims.take_ownership(PathBuf::from("shared.dll"), &foo());
        assert!(claims.share(Path::new("shared.dll"), &bar()));

        assert_eq!(claims.orphaned_by(&foo()), vec![PathBuf::from("Foo/a.cfg")]);

        let orphaned = claims.release(&foo());

        assert_eq!(orphaned, vec![PathBuf::from("Foo/a.cfg")]);
        let record = claims.owner_of(Path::new("shared.dll")).unwrap();
        assert_eq!(record.owner, bar());
        assert!(record.shared_with.is_empty());
    }

    #[test]
    fn test_release_of_sharer_keeps_owner() {
        let mut claims = FileClaims::new();
        claims.take_ownership(PathBuf::from("shared.dll"), &foo());
        claims.share(Path::new("shared.dll"), &bar());

        assert!(claims.release(&bar()).is_empty());
        assert_eq!(claims.paths_claimed_by(&bar()), Vec::<PathBuf>::new());
        assert_eq!(claims.paths_claimed_by(&foo()), vec![PathBuf::from("shared.dll")]);
    }

    #[test]
    fn test_validate_detects_owner_listed_as_sharer() {
        let mut claims = FileClaims::new();
        claims.take_ownership(PathBuf::from("a.cfg"), &foo());
        claims
            .0
            .get_mut(Path::new("a.cfg"))
            .unwrap()
            .shared_with
            .insert(foo());

        let result = claims.validate([Path::new("a.cfg")], |_| true);
        assert!(matches!(result, Err(RegistryError::Ownership { .. })));
    }

    #[test]
    fn test_validate_detects_unregistered_claimant() {
        let mut claims = FileClaims::new();
        claims.take_ownership(PathBuf::from("a.cfg"), &foo());

        assert!(claims.validate([Path::new("a.cfg")], |_| true).is_ok());
        let result = claims.validate([Path::new("a.cfg")], |id| *id != foo());
        assert!(matches!(result, Err(RegistryError::Ownership { .. })));
    }

    #[test]
    fn test_serializes_as_path_map() {
        let mut claims = FileClaims::new();
        claims.take_ownership(PathBuf::from("Foo/a.cfg"), &foo());

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["Foo/a.cfg"]["owner"], "example.com/foo");

        let restored: FileClaims = serde_json::from_value(json).unwrap();
        assert_eq!(restored, claims);
    }
}
