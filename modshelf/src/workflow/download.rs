//! Download-and-update workflow.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use super::context::StepContext;
use super::files::{archive_user, remove_archive};
use super::outcome::ModChange;
use super::{Step, Workflow, WorkflowKind};
use crate::manager::config::REGISTRY_FILENAME;
use crate::manager::download::{format_bytes, ProgressThrottle};
use crate::manager::staging::move_into_place;
use crate::manager::{
    ArchiveFetcher, ArchiveNames, ArchiveReservation, ManagerConfig, ManagerError, ManagerResult,
    ModPageResolver,
};
use crate::package::{Mod, ModId, ModMetadata};
use crate::registry::ModRegistry;

const STEPS: &[&str] = &[
    "Fetching metadata",
    "Comparing versions",
    "Downloading archive",
    "Storing archive",
    "Updating registry",
];

/// Fetches a mod's newest archive and records it in the registry.
///
/// Used both to add a mod and to update one. Stops after the comparison
/// when the stored archive is already the newest version.
///
/// The archive file name stays reserved from the comparison until the
/// workflow is dropped, so no other download can store the same file.
pub struct DownloadWorkflow {
    id: ModId,
    page_url: Url,
    config: Arc<ManagerConfig>,
    registry: Arc<ModRegistry>,
    resolver: Arc<dyn ModPageResolver>,
    fetcher: Arc<dyn ArchiveFetcher>,
    archive_names: ArchiveNames,
    metadata: Option<ModMetadata>,
    _reservation: Option<ArchiveReservation>,
    staged: Option<PathBuf>,
}

impl DownloadWorkflow {
    /// Create a workflow for the mod published at `page_url`.
    pub fn new(
        page_url: Url,
        config: Arc<ManagerConfig>,
        registry: Arc<ModRegistry>,
        resolver: Arc<dyn ModPageResolver>,
        fetcher: Arc<dyn ArchiveFetcher>,
        archive_names: ArchiveNames,
    ) -> Self {
        Self {
            id: ModId::from_page_url(&page_url),
            page_url,
            config,
            registry,
            resolver,
            fetcher,
            archive_names,
            metadata: None,
            _reservation: None,
            staged: None,
        }
    }

    fn metadata(&self) -> ManagerResult<&ModMetadata> {
        self.metadata
            .as_ref()
            .ok_or_else(|| ManagerError::MetadataFetchFailed {
                url: self.page_url.to_string(),
                reason: "metadata was not fetched".to_string(),
            })
    }

    fn fetch_metadata(&mut self) -> ManagerResult<Step> {
        let metadata = self.resolver.resolve(&self.page_url)?;

        let reserved = metadata.archive_filename == REGISTRY_FILENAME
            || metadata.archive_filename.ends_with(".tmp");
        if !metadata.has_safe_filename() || reserved {
            return Err(ManagerError::MetadataParseFailed {
                url: self.page_url.to_string(),
                reason: format!("unusable archive file name '{}'", metadata.archive_filename),
            });
        }

        debug!(
            mod_id = %self.id,
            archive = %metadata.archive_filename,
            updated_on = %metadata.updated_on,
            "Resolved mod metadata"
        );
        self.metadata = Some(metadata);
        Ok(Step::Continue)
    }

    fn compare(&mut self, ctx: &StepContext<'_>) -> ManagerResult<Step> {
        let filename = self.metadata()?.archive_filename.clone();
        self._reservation = Some(self.archive_names.try_reserve(&filename, &self.id)?);
        let metadata = self.metadata()?;

        if let Some(owner) = archive_user(&self.registry, &self.id, &metadata.archive_filename)? {
            return Err(ManagerError::ArchiveNameTaken {
                filename: metadata.archive_filename.clone(),
                owner,
            });
        }

        if let Some(existing) = self.registry.get(&self.id)? {
            let stored = self.config.archive_path(existing.filename()).is_file();
            if stored && !existing.is_outdated_by(metadata) {
                info!(mod_id = %self.id, archive = existing.filename(), "Mod is up to date");
                ctx.report("Up to date", 1.0);
                let entry = self.registry.set_update_available(&self.id, false)?;
                return Ok(Step::Finish(ModChange::Updated(entry)));
            }
        }
        Ok(Step::Continue)
    }

    fn download(&mut self, ctx: &StepContext<'_>) -> ManagerResult<Step> {
        let metadata = self.metadata()?;
        let dest = self
            .config
            .staging_path(&self.id)
            .join(format!("{}.part", metadata.archive_filename));

        let mut throttle = ProgressThrottle::new();
        let bytes = self
            .fetcher
            .fetch(&metadata.download_url, &dest, &mut |done, total| {
                if let Some(fraction) = throttle.update(done, total) {
                    let message = match total {
                        Some(total) => {
                            format!("Downloaded {} of {}", format_bytes(done), format_bytes(total))
                        }
                        None => format!("Downloaded {}", format_bytes(done)),
                    };
                    ctx.report(message, fraction);
                }
            })?;

        info!(mod_id = %self.id, bytes, "Archive downloaded");
        self.staged = Some(dest);
        Ok(Step::Continue)
    }

    fn store(&mut self) -> ManagerResult<Step> {
        let staged = self.staged.take();
        let metadata = self.metadata()?;
        let staged = staged.ok_or_else(|| ManagerError::DownloadFailed {
            url: metadata.download_url.to_string(),
            reason: "no downloaded archive to store".to_string(),
        })?;

        let dest = self.config.archive_path(&metadata.archive_filename);
        move_into_place(&staged, &dest)?;
        // Empty once the archive has moved out.
        let _ = fs::remove_dir(self.config.staging_path(&self.id));

        debug!(mod_id = %self.id, archive = %dest.display(), "Archive stored");
        Ok(Step::Continue)
    }

    fn commit(&mut self) -> ManagerResult<Step> {
        let metadata = self.metadata()?.clone();

        let (entry, superseded) = match self.registry.get(&self.id)? {
            Some(mut existing) => {
                let previous = existing.filename().to_string();
                existing.apply_metadata(self.page_url.clone(), metadata);
                let superseded = (previous != existing.filename()).then_some(previous);
                (existing, superseded)
            }
            None => (
                Mod::from_metadata(self.id.clone(), self.page_url.clone(), metadata),
                None,
            ),
        };
        self.registry.add_or_update(entry.clone())?;
        info!(mod_id = %self.id, archive = entry.filename(), "Registry updated");

        if let Some(previous) = superseded {
            match remove_archive(&self.config, &self.registry, &self.id, &previous) {
                Ok(true) => debug!(mod_id = %self.id, archive = %previous, "Removed superseded archive"),
                Ok(false) => {}
                Err(e) => warn!(
                    mod_id = %self.id,
                    archive = %previous,
                    error = %e,
                    "Failed to remove superseded archive"
                ),
            }
        }

        Ok(Step::Finish(ModChange::Updated(entry)))
    }
}

impl Workflow for DownloadWorkflow {
    fn kind(&self) -> WorkflowKind {
        WorkflowKind::Download
    }

    fn mod_id(&self) -> &ModId {
        &self.id
    }

    fn steps(&self) -> &'static [&'static str] {
        STEPS
    }

    fn run_step(&mut self, index: usize, ctx: &StepContext<'_>) -> ManagerResult<Step> {
        match index {
            0 => self.fetch_metadata(),
            1 => self.compare(ctx),
            2 => self.download(ctx),
            3 => self.store(),
            4 => self.commit(),
            _ => Ok(Step::Continue),
        }
    }
}
