//! Disable workflow: remove a mod's files from the install directory.

use std::sync::Arc;

use tracing::info;

use super::context::StepContext;
use super::files::remove_installed_files;
use super::outcome::ModChange;
use super::{Step, Workflow, WorkflowKind};
use crate::manager::{ManagerConfig, ManagerError, ManagerResult};
use crate::package::ModId;
use crate::registry::ModRegistry;

const STEPS: &[&str] = &["Removing files", "Updating registry"];

/// Removes the files a mod exclusively owns and marks it disabled.
///
/// Paths still claimed by another enabled mod stay on disk; their ownership
/// passes to that mod when the registry is updated.
pub struct DisableWorkflow {
    id: ModId,
    config: Arc<ManagerConfig>,
    registry: Arc<ModRegistry>,
}

impl DisableWorkflow {
    /// Create a workflow disabling the given mod.
    pub fn new(id: ModId, config: Arc<ManagerConfig>, registry: Arc<ModRegistry>) -> Self {
        Self {
            id,
            config,
            registry,
        }
    }

    fn remove_files(&mut self, ctx: &StepContext<'_>) -> ManagerResult<Step> {
        let entry = self
            .registry
            .get(&self.id)?
            .ok_or_else(|| ManagerError::ModNotFound(self.id.clone()))?;
        if !entry.enabled {
            return Err(ManagerError::ModAlreadyDisabled(self.id.clone()));
        }

        let orphaned = self.registry.claims()?.orphaned_by(&self.id);
        let removed = remove_installed_files(&self.config.install_dir, &orphaned, ctx)?;
        info!(mod_id = %self.id, removed, "Removed installed files");
        Ok(Step::Continue)
    }
}

impl Workflow for DisableWorkflow {
    fn kind(&self) -> WorkflowKind {
        WorkflowKind::Disable
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
            1 => {
                let entry = self.registry.commit_disable(&self.id)?;
                Ok(Step::Finish(ModChange::Updated(entry)))
            }
            _ => Ok(Step::Continue),
        }
    }
}
