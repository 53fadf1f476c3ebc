//! Delete workflow: disable if needed, then forget the mod.

use std::sync::Arc;

use tracing::{debug, info};

use super::context::StepContext;
use super::files::{remove_archive, remove_installed_files};
use super::outcome::ModChange;
use super::{Step, Workflow, WorkflowKind};
use crate::manager::{ManagerConfig, ManagerError, ManagerResult};
use crate::package::{Mod, ModId};
use crate::registry::ModRegistry;

const STEPS: &[&str] = &["Removing files", "Removing archive", "Updating registry"];

/// Removes a mod's installed files, its archive and its registry entry.
pub struct DeleteWorkflow {
    id: ModId,
    config: Arc<ManagerConfig>,
    registry: Arc<ModRegistry>,
    entry: Option<Mod>,
}

impl DeleteWorkflow {
    /// Create a workflow deleting the given mod.
    pub fn new(id: ModId, config: Arc<ManagerConfig>, registry: Arc<ModRegistry>) -> Self {
        Self {
            id,
            config,
            registry,
            entry: None,
        }
    }

    fn entry(&self) -> ManagerResult<&Mod> {
        self.entry
            .as_ref()
            .ok_or_else(|| ManagerError::ModNotFound(self.id.clone()))
    }

    fn remove_files(&mut self, ctx: &StepContext<'_>) -> ManagerResult<Step> {
        let entry = self
            .registry
            .get(&self.id)?
            .ok_or_else(|| ManagerError::ModNotFound(self.id.clone()))?;

        if entry.enabled {
            let orphaned = self.registry.claims()?.orphaned_by(&self.id);
            let removed = remove_installed_files(&self.config.install_dir, &orphaned, ctx)?;
            info!(mod_id = %self.id, removed, "Removed installed files");
        } else {
            debug!(mod_id = %self.id, "Mod not enabled, no files to remove");
        }

        self.entry = Some(entry);
        Ok(Step::Continue)
    }

    fn drop_archive(&mut self) -> ManagerResult<Step> {
        let entry = self.entry()?;
        let removed = remove_archive(&self.config, &self.registry, &self.id, entry.filename())?;
        debug!(mod_id = %self.id, archive = entry.filename(), removed, "Archive handled");
        Ok(Step::Continue)
    }

    fn commit(&mut self) -> ManagerResult<Step> {
        let removed = self
            .registry
            .remove(&self.id)?
            .ok_or_else(|| ManagerError::ModNotFound(self.id.clone()))?;
        info!(mod_id = %self.id, "Mod deleted");
        Ok(Step::Finish(ModChange::Deleted(removed)))
    }
}

impl Workflow for DeleteWorkflow {
    fn kind(&self) -> WorkflowKind {
        WorkflowKind::Delete
    }

    fn mod_id(&self) -> &ModId {
        &self.id
    }

    fn steps(&self) -> &'static [&'static str] {
        STEPS
    }

    fn run_step(&mut self, index: usize, ctx: &StepContext<'_>) -> ManagerResult<Step> {
        match index {
            0 => self.remove_files(ctx),
            1 => self.drop_archive(),
            2 => self.commit(),
            _ => Ok(Step::Continue),
        }
    }
}
