//! The mod manager: lifecycle requests in, workflows out.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           ModManager                             │
//! │                                                                  │
//! │  request ──► validate against registry ──► claim mod (in-flight) │
//! │                                                  │               │
//! │                                                  ▼               │
//! │                                          build Workflow          │
//! │                           ┌──────────────────────┴────────┐      │
//! │                           ▼                               ▼      │
//! │                 download pool (N workers)     filesystem pool (1)│
//! │                 download, check               enable, disable,   │
//! │                                               delete             │
//! │                           └──────────────┬────────────────┘      │
//! │                                          ▼                       │
//! │                          EventBus ──► subscribers (CLI, UI)      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Requests are validated synchronously: a precondition violation is
//! returned to the caller and no workflow is created. Accepted requests
//! return a [`WorkflowHandle`]; completion is reported through the handle
//! and as [`ManagerEvent`]s.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info};
use url::Url;

use super::config::ManagerConfig;
use super::download::{HttpFetcher, ManifestResolver};
use super::error::{ManagerError, ManagerResult};
use super::extractor::ZipExtractor;
use super::in_flight::{ArchiveNames, InFlight};
use super::staging::purge_staging;
use super::traits::{ArchiveExtractor, ArchiveFetcher, ModPageResolver};
use crate::conflict::{ConflictResolver, PolicyResolver};
use crate::executor::{EventBus, WorkflowPool};
use crate::package::{Mod, ModId};
use crate::registry::ModRegistry;
use crate::workflow::{
    CheckWorkflow, DeleteWorkflow, DisableWorkflow, DownloadWorkflow, EnableWorkflow,
    ManagerEvent, PoolKind, Workflow, WorkflowHandle, WorkflowJob,
};

/// Result of submitting one workflow per registered mod.
#[derive(Debug, Default)]
pub struct BatchSubmission {
    /// Workflows that were queued.
    pub handles: Vec<WorkflowHandle>,
    /// Mods that were skipped, with the reason.
    pub rejected: Vec<(ModId, ManagerError)>,
}

impl BatchSubmission {
    /// Whether nothing was submitted or rejected.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty() && self.rejected.is_empty()
    }
}

/// Builder for [`ModManager`].
pub struct ModManagerBuilder {
    config: ManagerConfig,
    resolver: Option<Arc<dyn ModPageResolver>>,
    fetcher: Option<Arc<dyn ArchiveFetcher>>,
    extractor: Option<Arc<dyn ArchiveExtractor>>,
    conflicts: Option<Arc<dyn ConflictResolver>>,
    runtime: Option<Handle>,
}

impl ModManagerBuilder {
    /// Start from a configuration.
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            resolver: None,
            fetcher: None,
            extractor: None,
            conflicts: None,
            runtime: None,
        }
    }

    /// Use a custom mod page resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn ModPageResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Use a custom archive fetcher.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ArchiveFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Use a custom archive extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Use a custom conflict resolver instead of the configured policy.
    pub fn with_conflict_resolver(mut self, conflicts: Arc<dyn ConflictResolver>) -> Self {
        self.conflicts = Some(conflicts);
        self
    }

    /// Run the pools on the given runtime instead of the current one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Validate the configuration and start the pools.
    pub fn build(self) -> ManagerResult<ModManager> {
        self.config.validate()?;
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| ManagerError::NoRuntime)?,
        };

        let config = Arc::new(self.config);
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(ManifestResolver::with_timeout(config.timeout)));
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(HttpFetcher::with_timeout(config.timeout)));
        let extractor = self
            .extractor
            .unwrap_or_else(|| Arc::new(ZipExtractor::new()));
        let conflicts = self
            .conflicts
            .unwrap_or_else(|| Arc::new(PolicyResolver::new(config.conflict_policy)));

        let download_pool =
            WorkflowPool::spawn("download", config.max_concurrent_downloads, &runtime);
        let filesystem_pool = WorkflowPool::spawn("filesystem", 1, &runtime);

        info!(
            install_dir = %config.install_dir.display(),
            archive_dir = %config.archive_dir.display(),
            downloads = config.max_concurrent_downloads,
            conflict_policy = %config.conflict_policy,
            "Mod manager started"
        );

        Ok(ModManager {
            registry: Arc::new(ModRegistry::open(config.registry_path())),
            config,
            resolver,
            fetcher,
            extractor,
            conflicts,
            events: Arc::new(EventBus::new()),
            in_flight: InFlight::new(),
            archive_names: ArchiveNames::new(),
            download_pool,
            filesystem_pool,
        })
    }
}

/// Orchestrates the lifecycle of managed mods.
///
/// # Example
///
/// ```ignore
/// let manager = ModManager::new(config)?;
/// let mut events = manager.subscribe();
///
/// let handle = manager.add_new_mod("https://example.com/mods/foo")?;
/// assert!(handle.wait().await.is_success());
///
/// let foo = manager.find_mod(&ModId::new("example.com/mods/foo"))?;
/// manager.enable_mod(&foo.id)?.wait().await;
/// ```
pub struct ModManager {
    config: Arc<ManagerConfig>,
    registry: Arc<ModRegistry>,
    resolver: Arc<dyn ModPageResolver>,
    fetcher: Arc<dyn ArchiveFetcher>,
    extractor: Arc<dyn ArchiveExtractor>,
    conflicts: Arc<dyn ConflictResolver>,
    events: Arc<EventBus<ManagerEvent>>,
    in_flight: InFlight,
    archive_names: ArchiveNames,
    download_pool: WorkflowPool,
    filesystem_pool: WorkflowPool,
}

impl ModManager {
    /// Create a manager with the default collaborators on the current
    /// Tokio runtime.
    pub fn new(config: ManagerConfig) -> ManagerResult<Self> {
        Self::builder(config).build()
    }

    /// Start building a manager.
    pub fn builder(config: ManagerConfig) -> ModManagerBuilder {
        ModManagerBuilder::new(config)
    }

    /// The manager's configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The registry backing the manager.
    pub fn registry(&self) -> &Arc<ModRegistry> {
        &self.registry
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ManagerEvent> {
        self.events.subscribe()
    }

    /// Snapshot of all registered mods.
    pub fn mods(&self) -> ManagerResult<Vec<Mod>> {
        Ok(self.registry.get_mods()?)
    }

    /// Look up a registered mod.
    pub fn find_mod(&self, id: &ModId) -> ManagerResult<Mod> {
        self.registry
            .get(id)?
            .ok_or_else(|| ManagerError::ModNotFound(id.clone()))
    }

    /// Whether the mod's archive is in the archive directory.
    pub fn is_downloaded(&self, entry: &Mod) -> bool {
        self.config.archive_path(entry.filename()).is_file()
    }

    /// Number of workflows running on each pool, `(download, filesystem)`.
    pub fn active_workflows(&self) -> (usize, usize) {
        (self.download_pool.active(), self.filesystem_pool.active())
    }

    /// Add the mod published at `url` and download it.
    pub fn add_new_mod(&self, url: &str) -> ManagerResult<WorkflowHandle> {
        let page_url = Url::parse(url.trim()).map_err(|_| ManagerError::CannotAddMod {
            url: url.to_string(),
        })?;
        if !self.resolver.accepts(&page_url) {
            return Err(ManagerError::CannotAddMod {
                url: url.to_string(),
            });
        }
        self.submit(Box::new(self.download_workflow(page_url)))
    }

    /// Download the newest version of a registered mod.
    pub fn update_mod(&self, id: &ModId) -> ManagerResult<WorkflowHandle> {
        let entry = self.find_mod(id)?;
        self.submit(Box::new(
            self.download_workflow(entry.source_url().clone()),
        ))
    }

    /// Update every registered mod.
    ///
    /// A mod that cannot be submitted is reported and does not stop the
    /// batch.
    pub fn update_mods(&self) -> ManagerResult<BatchSubmission> {
        self.for_each_mod(|entry| self.update_mod(&entry.id))
    }

    /// Install a downloaded mod's files.
    pub fn enable_mod(&self, id: &ModId) -> ManagerResult<WorkflowHandle> {
        let entry = self.find_mod(id)?;
        if entry.enabled {
            return Err(ManagerError::ModAlreadyEnabled(id.clone()));
        }
        if !self.is_downloaded(&entry) {
            return Err(ManagerError::ModNotDownloaded {
                id: id.clone(),
                archive: self.config.archive_path(entry.filename()),
            });
        }

        self.submit(Box::new(EnableWorkflow::new(
            id.clone(),
            Arc::clone(&self.config),
            Arc::clone(&self.registry),
            Arc::clone(&self.extractor),
            Arc::clone(&self.conflicts),
        )))
    }

    /// Remove an enabled mod's files.
    pub fn disable_mod(&self, id: &ModId) -> ManagerResult<WorkflowHandle> {
        let entry = self.find_mod(id)?;
        if !entry.enabled {
            return Err(ManagerError::ModAlreadyDisabled(id.clone()));
        }

        self.submit(Box::new(DisableWorkflow::new(
            id.clone(),
            Arc::clone(&self.config),
            Arc::clone(&self.registry),
        )))
    }

    /// Remove a mod's files, archive and registry entry.
    pub fn delete_mod(&self, id: &ModId) -> ManagerResult<WorkflowHandle> {
        self.find_mod(id)?;
        self.submit(Box::new(DeleteWorkflow::new(
            id.clone(),
            Arc::clone(&self.config),
            Arc::clone(&self.registry),
        )))
    }

    /// Check every registered mod for a newer version without downloading.
    pub fn check_for_mod_updates(&self) -> ManagerResult<BatchSubmission> {
        self.for_each_mod(|entry| {
            self.submit(Box::new(CheckWorkflow::new(
                entry.id.clone(),
                entry.source_url().clone(),
                Arc::clone(&self.registry),
                Arc::clone(&self.resolver),
            )))
        })
    }

    /// Remove staging leftovers of cancelled or failed downloads.
    ///
    /// Staging directories of mods with a workflow in progress are kept.
    pub fn cleanup_staging(&self) -> ManagerResult<usize> {
        let keep: HashSet<String> = self
            .in_flight
            .snapshot()
            .iter()
            .map(ModId::slug)
            .collect();
        let removed = purge_staging(&self.config.staging_dir, &keep)?;
        info!(
            staging_dir = %self.config.staging_dir.display(),
            removed,
            "Cleaned up staging directory"
        );
        Ok(removed)
    }

    fn download_workflow(&self, page_url: Url) -> DownloadWorkflow {
        DownloadWorkflow::new(
            page_url,
            Arc::clone(&self.config),
            Arc::clone(&self.registry),
            Arc::clone(&self.resolver),
            Arc::clone(&self.fetcher),
            self.archive_names.clone(),
        )
    }

    fn for_each_mod(
        &self,
        mut submit: impl FnMut(&Mod) -> ManagerResult<WorkflowHandle>,
    ) -> ManagerResult<BatchSubmission> {
        let mut batch = BatchSubmission::default();
        for entry in self.registry.get_mods()? {
            match submit(&entry) {
                Ok(handle) => batch.handles.push(handle),
                Err(e) => {
                    debug!(mod_id = %entry.id, error = %e, "Skipped mod in batch");
                    batch.rejected.push((entry.id.clone(), e));
                }
            }
        }
        Ok(batch)
    }

    fn submit(&self, workflow: Box<dyn Workflow>) -> ManagerResult<WorkflowHandle> {
        let claim = self.in_flight.try_acquire(workflow.mod_id())?;
        let pool = match workflow.kind().pool() {
            PoolKind::Download => &self.download_pool,
            PoolKind::Filesystem => &self.filesystem_pool,
        };

        let (job, handle) = WorkflowJob::new(workflow, Arc::clone(&self.events), claim);
        pool.submit(move || job.run())?;

        debug!(
            workflow = %handle.id(),
            kind = handle.kind().name(),
            mod_id = %handle.mod_id(),
            pool = pool.name(),
            queued = pool.queued(),
            "Workflow submitted"
        );
        Ok(handle)
    }
}
