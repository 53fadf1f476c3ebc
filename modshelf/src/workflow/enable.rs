//! Enable workflow: materialize a mod's files in the install directory.
//!
//! Every conflict is resolved before the first byte is written, so an abort
//! leaves the install directory untouched. Each planned path ends up with
//! one of these claims:
//!
//! ```text
//! destination            existing bytes   decision    claim   written
//! ─────────────────────  ───────────────  ──────────  ──────  ───────
//! missing                -                -           own     yes
//! owned by this mod      any              -           own     yes
//! present                identical        -           share*  no
//! present                different        overwrite   own     yes
//! present                different        keep        share*  no
//! present                different        abort       -       workflow fails
//!
//! * only when another mod owns the path; untracked files are left alone
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::context::StepContext;
use super::files::write_installed_file;
use super::outcome::ModChange;
use super::{Step, Workflow, WorkflowKind};
use crate::conflict::{Conflict, ConflictDecision, ConflictResolver};
use crate::manager::download::ProgressThrottle;
use crate::manager::{ArchiveEntry, ArchiveExtractor, ManagerConfig, ManagerError, ManagerResult};
use crate::package::{Mod, ModId};
use crate::registry::{FileClaim, FileClaims, ModRegistry};

const STEPS: &[&str] = &[
    "Unpacking archive",
    "Resolving conflicts",
    "Writing files",
    "Updating registry",
];

/// Installs a downloaded mod's files and marks it enabled.
pub struct EnableWorkflow {
    id: ModId,
    config: Arc<ManagerConfig>,
    registry: Arc<ModRegistry>,
    extractor: Arc<dyn ArchiveExtractor>,
    conflicts: Arc<dyn ConflictResolver>,
    entry: Option<Mod>,
    files: Vec<ArchiveEntry>,
    writes: Vec<usize>,
    claims: Vec<FileClaim>,
}

impl EnableWorkflow {
    /// Create a workflow enabling the given mod.
    pub fn new(
        id: ModId,
        config: Arc<ManagerConfig>,
        registry: Arc<ModRegistry>,
        extractor: Arc<dyn ArchiveExtractor>,
        conflicts: Arc<dyn ConflictResolver>,
    ) -> Self {
        Self {
            id,
            config,
            registry,
            extractor,
            conflicts,
            entry: None,
            files: Vec::new(),
            writes: Vec::new(),
            claims: Vec::new(),
        }
    }

    fn unpack(&mut self, ctx: &StepContext<'_>) -> ManagerResult<Step> {
        let entry = self
            .registry
            .get(&self.id)?
            .ok_or_else(|| ManagerError::ModNotFound(self.id.clone()))?;
        if entry.enabled {
            return Err(ManagerError::ModAlreadyEnabled(self.id.clone()));
        }

        let archive = self.config.archive_path(entry.filename());
        if !archive.is_file() {
            return Err(ManagerError::ModNotDownloaded {
                id: self.id.clone(),
                archive,
            });
        }

        self.files = self
            .extractor
            .extract(&archive, self.config.install_root_name())?;
        ctx.report(format!("Unpacked {} files", self.files.len()), 1.0);
        debug!(mod_id = %self.id, files = self.files.len(), "Archive unpacked");

        self.entry = Some(entry);
        Ok(Step::Continue)
    }

    fn resolve_conflicts(&mut self, ctx: &StepContext<'_>) -> ManagerResult<Step> {
        let candidate_name = self
            .entry
            .as_ref()
            .map(|e| e.name.clone())
            .unwrap_or_else(|| self.id.to_string());
        let claims = self.registry.claims()?;
        let mut decisions: HashMap<PathBuf, ConflictDecision> = HashMap::new();
        let mut throttle = ProgressThrottle::new();

        for (index, file) in self.files.iter().enumerate() {
            let dest = self.config.install_dir.join(&file.path);
            let tracked = claims.owner_of(&file.path);

            let plan = if tracked.is_some_and(|record| record.owner == self.id) {
                Plan::Write
            } else {
                match existing_matches(&dest, &file.contents)? {
                    None => Plan::Write,
                    Some(true) => Plan::Keep,
                    Some(false) => {
                        let decision = *decisions.entry(file.path.clone()).or_insert_with(|| {
                            self.conflicts.resolve(&Conflict {
                                path: file.path.clone(),
                                existing_owner: tracked.map(|record| record.owner.clone()),
                                candidate: self.id.clone(),
                                candidate_name: candidate_name.clone(),
                            })
                        });
                        debug!(
                            mod_id = %self.id,
                            path = %file.path.display(),
                            decision = %decision,
                            "Conflict resolved"
                        );
                        match decision {
                            ConflictDecision::Overwrite => Plan::Write,
                            ConflictDecision::Keep => Plan::Keep,
                            ConflictDecision::Abort => {
                                return Err(ManagerError::ConflictAborted {
                                    path: file.path.clone(),
                                })
                            }
                        }
                    }
                }
            };

            match plan {
                Plan::Write => {
                    self.writes.push(index);
                    self.claims.push(FileClaim::own(&file.path));
                }
                Plan::Keep if is_tracked(&claims, &file.path) => {
                    self.claims.push(FileClaim::share(&file.path));
                }
                Plan::Keep => {}
            }

            if let Some(fraction) =
                throttle.update(index as u64 + 1, Some(self.files.len() as u64))
            {
                ctx.report(format!("Checked {}", file.path.display()), fraction);
            }
        }
        Ok(Step::Continue)
    }

    fn write_files(&mut self, ctx: &StepContext<'_>) -> ManagerResult<Step> {
        let mut throttle = ProgressThrottle::new();
        for (done, &index) in self.writes.iter().enumerate() {
            let file = &self.files[index];
            write_installed_file(&self.config.install_dir.join(&file.path), &file.contents)?;

            if let Some(fraction) = throttle.update(done as u64 + 1, Some(self.writes.len() as u64))
            {
                ctx.report(format!("Wrote {}", file.path.display()), fraction);
            }
        }
        // Contents are no longer needed; only the claims are committed.
        self.files = Vec::new();
        Ok(Step::Continue)
    }

    fn commit(&mut self) -> ManagerResult<Step> {
        let entry = self.registry.commit_enable(&self.id, &self.claims)?;
        info!(
            mod_id = %self.id,
            written = self.writes.len(),
            claimed = self.claims.len(),
            "Mod enabled"
        );
        Ok(Step::Finish(ModChange::Updated(entry)))
    }
}

impl Workflow for EnableWorkflow {
    fn kind(&self) -> WorkflowKind {
        WorkflowKind::Enable
    }

    fn mod_id(&self) -> &ModId {
        &self.id
    }

    fn steps(&self) -> &'static [&'static str] {
        STEPS
    }

    fn run_step(&mut self, index: usize, ctx: &StepContext<'_>) -> ManagerResult<Step> {
        match index {
            0 => self.unpack(ctx),
            1 => self.resolve_conflicts(ctx),
            2 => self.write_files(ctx),
            3 => self.commit(),
            _ => Ok(Step::Continue),
        }
    }
}

/// What happens to one archive entry.
enum Plan {
    Write,
    Keep,
}

fn is_tracked(claims: &FileClaims, path: &Path) -> bool {
    claims.owner_of(path).is_some()
}

/// Compare an existing destination with candidate bytes.
///
/// Returns `None` when nothing is there yet.
fn existing_matches(dest: &Path, contents: &[u8]) -> ManagerResult<Option<bool>> {
    let metadata = match fs::metadata(dest) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ManagerError::ReadFailed {
                path: dest.to_path_buf(),
                source: e,
            })
        }
    };

    if metadata.is_dir() {
        return Err(ManagerError::WriteFailed {
            path: dest.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "a directory occupies the destination",
            ),
        });
    }
    if metadata.len() != contents.len() as u64 {
        return Ok(Some(false));
    }

    let existing = fs::read(dest).map_err(|e| ManagerError::ReadFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;
    Ok(Some(existing == contents))
}
