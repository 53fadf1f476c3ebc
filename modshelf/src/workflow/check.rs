//! Check-for-update workflow.

use std::sync::Arc;

use tracing::info;
use url::Url;

use super::context::StepContext;
use super::outcome::ModChange;
use super::{Step, Workflow, WorkflowKind};
use crate::manager::{ManagerError, ManagerResult, ModPageResolver};
use crate::package::{ModId, ModMetadata};
use crate::registry::ModRegistry;

const STEPS: &[&str] = &["Fetching metadata", "Comparing versions"];

/// Compares a mod's remote metadata with the registry and flags updates.
///
/// Never touches the filesystem; the update flag lives in memory only.
pub struct CheckWorkflow {
    id: ModId,
    page_url: Url,
    registry: Arc<ModRegistry>,
    resolver: Arc<dyn ModPageResolver>,
    metadata: Option<ModMetadata>,
}

impl CheckWorkflow {
    /// Create a check for a registered mod.
    pub fn new(
        id: ModId,
        page_url: Url,
        registry: Arc<ModRegistry>,
        resolver: Arc<dyn ModPageResolver>,
    ) -> Self {
        Self {
            id,
            page_url,
            registry,
            resolver,
            metadata: None,
        }
    }

    fn compare(&mut self, ctx: &StepContext<'_>) -> ManagerResult<Step> {
        let metadata = self
            .metadata
            .take()
            .ok_or_else(|| ManagerError::MetadataFetchFailed {
                url: self.page_url.to_string(),
                reason: "metadata was not fetched".to_string(),
            })?;
        let existing = self
            .registry
            .get(&self.id)?
            .ok_or_else(|| ManagerError::ModNotFound(self.id.clone()))?;

        let available = existing.is_outdated_by(&metadata);
        let entry = self.registry.set_update_available(&self.id, available)?;
        if available {
            info!(
                mod_id = %self.id,
                installed = existing.filename(),
                latest = %metadata.archive_filename,
                "Update available"
            );
            ctx.report("Update available", 1.0);
        } else {
            ctx.report("Up to date", 1.0);
        }
        Ok(Step::Finish(ModChange::Updated(entry)))
    }
}

impl Workflow for CheckWorkflow {
    fn kind(&self) -> WorkflowKind {
        WorkflowKind::Check
    }

    fn mod_id(&self) -> &ModId {
        &self.id
    }

    fn steps(&self) -> &'static [&'static str] {
        STEPS
    }

    fn run_step(&mut self, index: usize, ctx: &StepContext<'_>) -> ManagerResult<Step> {
        match index {
            0 => {
                self.metadata = Some(self.resolver.resolve(&self.page_url)?);
                Ok(Step::Continue)
            }
            1 => self.compare(ctx),
            _ => Ok(Step::Continue),
        }
    }
}
