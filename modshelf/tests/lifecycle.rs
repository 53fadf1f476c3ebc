//! End-to-end tests for the mod manager.
//!
//! These tests drive `ModManager` through complete lifecycles against a fake
//! mod site serving real zip archives:
//! - add, enable, disable and delete with registry and disk kept in step
//! - up-to-date detection and version updates
//! - synchronous precondition rejections and single-flight per mod
//! - conflict handling for shared install paths
//! - pool bounds, FIFO filesystem ordering and cancellation
//!
//! Run with: `cargo test --test lifecycle`

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use tokio::sync::mpsc;
use url::Url;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use modshelf::conflict::{
    ChannelPrompt, Conflict, ConflictDecision, ConflictPolicy, ConflictResolver, PromptResolver,
};
use modshelf::manager::{
    ArchiveFetcher, ManagerConfig, ManagerError, ManagerResult, ModManager, ModPageResolver,
};
use modshelf::package::{ModId, ModMetadata};
use modshelf::registry::ModRegistry;
use modshelf::workflow::{ManagerEvent, WorkflowKind};

// ============================================================================
// Fake mod site
// ============================================================================

/// Blocks fetches until opened.
#[derive(Default)]
struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
    }

    fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }
}

/// In-memory mod pages and archives.
#[derive(Default)]
struct FakeSite {
    pages: Mutex<HashMap<String, ModMetadata>>,
    archives: Mutex<HashMap<String, Vec<u8>>>,
    failing: Mutex<HashSet<String>>,
    gated: Mutex<HashSet<String>>,
    gate: Gate,
    delay: Mutex<Duration>,
    fetches: AtomicUsize,
    waiting: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeSite {
    /// Publish a version of a mod and return its page URL.
    fn publish(&self, slug: &str, version: &str, day: u32, entries: &[(&str, &[u8])]) -> String {
        self.publish_as(slug, &format!("{}-{}.zip", slug, version), day, entries)
    }

    fn publish_as(&self, slug: &str, filename: &str, day: u32, entries: &[(&str, &[u8])]) -> String {
        let page = format!("https://mods.test/{}", slug);
        let download = format!("https://cdn.mods.test/{}/{}", slug, filename);

        self.pages.lock().unwrap().insert(
            page.clone(),
            ModMetadata {
                name: slug.to_uppercase(),
                creator: "tester".to_string(),
                archive_filename: filename.to_string(),
                download_url: Url::parse(&download).unwrap(),
                image_url: None,
                updated_on: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            },
        );
        self.archives
            .lock()
            .unwrap()
            .insert(download, build_zip(entries));
        page
    }

    fn download_url(&self, page: &str) -> String {
        self.pages.lock().unwrap()[page].download_url.to_string()
    }

    fn fail_download(&self, page: &str) {
        let url = self.download_url(page);
        self.failing.lock().unwrap().insert(url);
    }

    fn gate_download(&self, page: &str) {
        let url = self.download_url(page);
        self.gated.lock().unwrap().insert(url);
    }

    fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Wait until a gated fetch is blocked.
    async fn wait_for_blocked_fetch(&self) {
        for _ in 0..200 {
            if self.waiting.load(Ordering::SeqCst) > 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no fetch reached the gate");
    }

    fn fail(url: &Url, reason: &str) -> ManagerError {
        ManagerError::DownloadFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl ModPageResolver for FakeSite {
    fn accepts(&self, url: &Url) -> bool {
        url.scheme() == "https"
    }

    fn resolve(&self, url: &Url) -> ManagerResult<ModMetadata> {
        self.pages
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| ManagerError::MetadataFetchFailed {
                url: url.to_string(),
                reason: "404".to_string(),
            })
    }
}

impl ArchiveFetcher for FakeSite {
    fn fetch(
        &self,
        url: &Url,
        dest: &Path,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> ManagerResult<u64> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        if self.gated.lock().unwrap().contains(url.as_str()) {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            self.gate.wait();
        }
        let delay = *self.delay.lock().unwrap();
        std::thread::sleep(delay);

        let result = if self.failing.lock().unwrap().contains(url.as_str()) {
            Err(Self::fail(url, "connection reset"))
        } else {
            match self.archives.lock().unwrap().get(url.as_str()) {
                Some(bytes) => {
                    fs::create_dir_all(dest.parent().unwrap()).unwrap();
                    fs::write(dest, bytes).unwrap();
                    progress(bytes.len() as u64, Some(bytes.len() as u64));
                    Ok(bytes.len() as u64)
                }
                None => Err(Self::fail(url, "404")),
            }
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(contents).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Resolver that counts how often it was asked.
struct CountingResolver {
    decision: ConflictDecision,
    asked: AtomicUsize,
}

impl ConflictResolver for CountingResolver {
    fn resolve(&self, _conflict: &Conflict) -> ConflictDecision {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.decision
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    _temp: TempDir,
    config: ManagerConfig,
    site: Arc<FakeSite>,
    manager: ModManager,
    events: mpsc::UnboundedReceiver<ManagerEvent>,
}

impl Harness {
    fn new(policy: ConflictPolicy) -> Self {
        Self::build(policy, 4, None)
    }

    fn build(
        policy: ConflictPolicy,
        downloads: usize,
        resolver: Option<Arc<dyn ConflictResolver>>,
    ) -> Self {
        let temp = TempDir::new().unwrap();
        let install_dir = temp.path().join("game").join("GameData");
        fs::create_dir_all(&install_dir).unwrap();

        let config = ManagerConfig::new(install_dir, temp.path().join("archives"))
            .with_staging_dir(temp.path().join("staging"))
            .with_max_concurrent_downloads(downloads)
            .with_conflict_policy(policy);

        let site = Arc::new(FakeSite::default());
        let mut builder = ModManager::builder(config.clone())
            .with_resolver(site.clone())
            .with_fetcher(site.clone());
        if let Some(resolver) = resolver {
            builder = builder.with_conflict_resolver(resolver);
        }
        let manager = builder.build().unwrap();
        let events = manager.subscribe();

        Self {
            _temp: temp,
            config,
            site,
            manager,
            events,
        }
    }

    fn installed(&self, relative: &str) -> PathBuf {
        self.config.install_dir.join(relative)
    }

    async fn add(&self, page: &str) -> ModId {
        let handle = self.manager.add_new_mod(page).unwrap();
        let id = handle.mod_id().clone();
        let outcome = handle.wait().await;
        assert!(outcome.is_success(), "add {} failed: {}", page, outcome);
        id
    }

    async fn enable(&self, id: &ModId) {
        let outcome = self.manager.enable_mod(id).unwrap().wait().await;
        assert!(outcome.is_success(), "enable {} failed: {}", id, outcome);
    }

    async fn disable(&self, id: &ModId) {
        let outcome = self.manager.disable_mod(id).unwrap().wait().await;
        assert!(outcome.is_success(), "disable {} failed: {}", id, outcome);
    }

    fn drain_events(&mut self) -> Vec<ManagerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    fn owner(&self, relative: &str) -> Option<(ModId, Vec<ModId>)> {
        let claims = self.manager.registry().claims().unwrap();
        claims.owner_of(Path::new(relative)).map(|record| {
            (
                record.owner.clone(),
                record.shared_with.iter().cloned().collect(),
            )
        })
    }
}

fn mod_changes(events: &[ManagerEvent]) -> Vec<(ModId, bool)> {
    events
        .iter()
        .filter_map(|event| match event {
            ManagerEvent::ModChanged { entry, deleted } => Some((entry.id.clone(), *deleted)),
            _ => None,
        })
        .collect()
}

fn finished(events: &[ManagerEvent]) -> Vec<(WorkflowKind, ModId)> {
    events
        .iter()
        .filter_map(|event| match event {
            ManagerEvent::Finished { kind, mod_id, .. } => Some((*kind, mod_id.clone())),
            _ => None,
        })
        .collect()
}

const FOO_FILES: &[(&str, &[u8])] = &[
    ("GameData/Foo/part.cfg", b"foo part"),
    ("GameData/Foo/Textures/a.dds", b"foo texture"),
    ("README.txt", b"not installed"),
];

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_add_enable_disable_delete() {
    let mut h = Harness::new(ConflictPolicy::Abort);
    let page = h.site.publish("foo", "1.0", 1, FOO_FILES);

    let id = h.add(&page).await;
    assert_eq!(id, ModId::new("mods.test/foo"));

    let entry = h.manager.find_mod(&id).unwrap();
    assert_eq!(entry.name, "FOO");
    assert_eq!(entry.filename(), "foo-1.0.zip");
    assert!(!entry.enabled);
    assert!(h.manager.is_downloaded(&entry));

    h.enable(&id).await;
    assert_eq!(fs::read(h.installed("Foo/part.cfg")).unwrap(), b"foo part");
    assert_eq!(
        fs::read(h.installed("Foo/Textures/a.dds")).unwrap(),
        b"foo texture"
    );
    assert!(!h.installed("README.txt").exists());
    assert!(h.manager.find_mod(&id).unwrap().enabled);

    let mut owned = h.manager.registry().files_owned_by(&id).unwrap();
    owned.sort();
    assert_eq!(
        owned,
        vec![
            PathBuf::from("Foo/Textures/a.dds"),
            PathBuf::from("Foo/part.cfg"),
        ]
    );

    h.disable(&id).await;
    assert!(!h.installed("Foo").exists());
    assert!(h.config.install_dir.is_dir());
    assert!(!h.manager.find_mod(&id).unwrap().enabled);
    assert!(h.manager.registry().files_owned_by(&id).unwrap().is_empty());

    let outcome = h.manager.delete_mod(&id).unwrap().wait().await;
    assert!(outcome.is_success());
    assert!(!h.config.archive_path("foo-1.0.zip").exists());
    assert!(h.manager.mods().unwrap().is_empty());

    let events = h.drain_events();
    assert_eq!(
        mod_changes(&events),
        vec![
            (id.clone(), false),
            (id.clone(), false),
            (id.clone(), false),
            (id.clone(), true),
        ]
    );
    assert_eq!(
        finished(&events),
        vec![
            (WorkflowKind::Download, id.clone()),
            (WorkflowKind::Enable, id.clone()),
            (WorkflowKind::Disable, id.clone()),
            (WorkflowKind::Delete, id),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_delete_enabled_mod_removes_files() {
    let h = Harness::new(ConflictPolicy::Abort);
    let page = h.site.publish("foo", "1.0", 1, FOO_FILES);
    let id = h.add(&page).await;
    h.enable(&id).await;

    let outcome = h.manager.delete_mod(&id).unwrap().wait().await;
    assert!(outcome.is_success());
    assert!(!h.installed("Foo/part.cfg").exists());
    assert!(h.manager.registry().claims().unwrap().is_empty());
    assert!(matches!(
        h.manager.find_mod(&id),
        Err(ManagerError::ModNotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_events_are_ordered_per_workflow() {
    let mut h = Harness::new(ConflictPolicy::Abort);
    let page = h.site.publish("foo", "1.0", 1, FOO_FILES);
    h.add(&page).await;

    let events = h.drain_events();
    let last = events.len() - 1;
    assert!(matches!(events[last], ManagerEvent::Finished { .. }));
    assert!(matches!(events[last - 1], ManagerEvent::ModChanged { .. }));
    assert!(events[..last - 1]
        .iter()
        .all(|event| matches!(event, ManagerEvent::Progress { .. })));

    let mut previous = 0.0;
    for event in &events[..last - 1] {
        if let ManagerEvent::Progress { fraction, .. } = event {
            assert!(*fraction >= previous && *fraction <= 1.0);
            previous = *fraction;
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_registry_survives_reopen() {
    let h = Harness::new(ConflictPolicy::Abort);
    let foo = h.add(&h.site.publish("foo", "1.0", 1, FOO_FILES)).await;
    h.add(&h.site.publish("bar", "1.0", 1, &[("GameData/Bar/b.cfg", b"bar")]))
        .await;
    h.enable(&foo).await;

    let reopened = ModRegistry::open(h.config.registry_path());
    assert_eq!(reopened.get_mods().unwrap(), h.manager.mods().unwrap());
    assert_eq!(
        reopened.files_owned_by(&foo).unwrap(),
        h.manager.registry().files_owned_by(&foo).unwrap()
    );
}

// ============================================================================
// Updates
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_update_when_up_to_date_skips_download() {
    let mut h = Harness::new(ConflictPolicy::Abort);
    let page = h.site.publish("foo", "1.0", 1, FOO_FILES);
    let id = h.add(&page).await;
    assert_eq!(h.site.fetch_count(), 1);
    h.drain_events();

    let outcome = h.manager.update_mod(&id).unwrap().wait().await;
    assert!(outcome.is_success());
    assert_eq!(h.site.fetch_count(), 1);

    let events = h.drain_events();
    assert_eq!(mod_changes(&events), vec![(id.clone(), false)]);
    assert!(events.iter().any(|event| matches!(
        event,
        ManagerEvent::Progress { message, .. } if message == "Up to date"
    )));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_update_replaces_archive_and_keeps_enabled() {
    let h = Harness::new(ConflictPolicy::Abort);
    let page = h.site.publish("foo", "1.0", 1, FOO_FILES);
    let id = h.add(&page).await;
    h.enable(&id).await;

    h.site
        .publish("foo", "2.0", 2, &[("GameData/Foo/part.cfg", b"foo part v2")]);
    let outcome = h.manager.update_mod(&id).unwrap().wait().await;
    assert!(outcome.is_success(), "{}", outcome);

    let entry = h.manager.find_mod(&id).unwrap();
    assert_eq!(entry.filename(), "foo-2.0.zip");
    assert!(entry.enabled);
    assert!(h.config.archive_path("foo-2.0.zip").is_file());
    assert!(!h.config.archive_path("foo-1.0.zip").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_download_leaves_registry_untouched() {
    let mut h = Harness::new(ConflictPolicy::Abort);
    let page = h.site.publish("foo", "1.0", 1, FOO_FILES);
    let id = h.add(&page).await;
    let before = h.manager.find_mod(&id).unwrap();
    h.drain_events();

    h.site.publish("foo", "2.0", 2, FOO_FILES);
    h.site.fail_download(&page);
    let outcome = h.manager.update_mod(&id).unwrap().wait().await;
    assert!(outcome.is_failed());
    assert!(outcome.failure().unwrap().contains("connection reset"));

    assert_eq!(h.manager.find_mod(&id).unwrap(), before);
    assert!(h.config.archive_path("foo-1.0.zip").is_file());
    assert!(mod_changes(&h.drain_events()).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_check_flags_updates_without_downloading() {
    let h = Harness::new(ConflictPolicy::Abort);
    let foo = h.add(&h.site.publish("foo", "1.0", 1, FOO_FILES)).await;
    let bar = h
        .add(&h.site.publish("bar", "1.0", 1, &[("GameData/Bar/b.cfg", b"bar")]))
        .await;
    h.site.publish("foo", "1.1", 3, FOO_FILES);
    let fetches = h.site.fetch_count();

    let batch = h.manager.check_for_mod_updates().unwrap();
    assert!(batch.rejected.is_empty());
    assert_eq!(batch.handles.len(), 2);
    for handle in batch.handles {
        assert!(handle.wait().await.is_success());
    }

    assert!(h.manager.find_mod(&foo).unwrap().update_available);
    assert!(!h.manager.find_mod(&bar).unwrap().update_available);
    assert_eq!(h.site.fetch_count(), fetches);
    assert!(!h.config.archive_path("foo-1.1.zip").exists());

    assert!(h.manager.update_mod(&foo).unwrap().wait().await.is_success());
    let entry = h.manager.find_mod(&foo).unwrap();
    assert_eq!(entry.filename(), "foo-1.1.zip");
    assert!(!entry.update_available);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_archive_name_shared_with_other_mod_is_rejected() {
    let h = Harness::new(ConflictPolicy::Abort);
    h.add(&h.site.publish("foo", "1.0", 1, FOO_FILES)).await;
    let mirror = h.site.publish_as("mirror", "foo-1.0.zip", 1, FOO_FILES);

    let outcome = h.manager.add_new_mod(&mirror).unwrap().wait().await;
    assert!(outcome.is_failed());
    assert!(!h
        .manager
        .registry()
        .contains(&ModId::new("mods.test/mirror"))
        .unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_downloads_of_one_archive_name_store_only_one() {
    let h = Harness::new(ConflictPolicy::Abort);
    let alpha = h
        .site
        .publish_as("alpha", "same.zip", 1, &[("GameData/Alpha/a.cfg", b"alpha")]);
    let beta = h
        .site
        .publish_as("beta", "same.zip", 1, &[("GameData/Beta/b.cfg", b"beta")]);
    h.site.gate_download(&alpha);

    let first = h.manager.add_new_mod(&alpha).unwrap();
    h.site.wait_for_blocked_fetch().await;
    let second = h.manager.add_new_mod(&beta).unwrap();

    let outcome = second.wait().await;
    assert!(outcome.is_failed());
    assert!(
        outcome.failure().unwrap().contains("same.zip"),
        "{:?}",
        outcome
    );

    h.site.gate.open();
    assert!(first.wait().await.is_success());

    let stored: Vec<_> = h
        .manager
        .mods()
        .unwrap()
        .into_iter()
        .map(|m| (m.id.clone(), m.filename().to_string()))
        .collect();
    assert_eq!(
        stored,
        vec![(ModId::new("mods.test/alpha"), "same.zip".to_string())]
    );
    let alpha_bytes = h.site.archives.lock().unwrap()[&h.site.download_url(&alpha)].clone();
    assert_eq!(fs::read(h.config.archive_path("same.zip")).unwrap(), alpha_bytes);
    assert_eq!(h.site.fetch_count(), 1);
}

// ============================================================================
// Preconditions and single-flight
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_preconditions_are_rejected_synchronously() {
    let h = Harness::new(ConflictPolicy::Abort);

    for url in ["not a url", "ftp://mods.test/foo"] {
        let err = h.manager.add_new_mod(url).unwrap_err();
        assert!(matches!(err, ManagerError::CannotAddMod { .. }), "{}", err);
        assert!(err.is_precondition());
    }

    let unknown = ModId::new("mods.test/unknown");
    assert!(matches!(
        h.manager.enable_mod(&unknown),
        Err(ManagerError::ModNotFound(_))
    ));
    assert!(matches!(
        h.manager.delete_mod(&unknown),
        Err(ManagerError::ModNotFound(_))
    ));

    let id = h.add(&h.site.publish("foo", "1.0", 1, FOO_FILES)).await;
    assert!(matches!(
        h.manager.disable_mod(&id),
        Err(ManagerError::ModAlreadyDisabled(_))
    ));

    h.enable(&id).await;
    assert!(matches!(
        h.manager.enable_mod(&id),
        Err(ManagerError::ModAlreadyEnabled(_))
    ));

    h.disable(&id).await;
    fs::remove_file(h.config.archive_path("foo-1.0.zip")).unwrap();
    let err = h.manager.enable_mod(&id).unwrap_err();
    assert!(matches!(err, ManagerError::ModNotDownloaded { .. }));
    assert!(err.is_precondition());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_one_workflow_per_mod() {
    let h = Harness::new(ConflictPolicy::Abort);
    let page = h.site.publish("foo", "1.0", 1, FOO_FILES);
    let foo = h.add(&page).await;
    let bar = h
        .add(&h.site.publish("bar", "1.0", 1, &[("GameData/Bar/b.cfg", b"bar")]))
        .await;

    h.site.publish("foo", "2.0", 2, FOO_FILES);
    h.site.gate_download(&page);
    let running = h.manager.update_mod(&foo).unwrap();
    h.site.wait_for_blocked_fetch().await;

    assert!(matches!(
        h.manager.update_mod(&foo),
        Err(ManagerError::WorkflowInFlight(_))
    ));
    assert!(matches!(
        h.manager.enable_mod(&foo),
        Err(ManagerError::WorkflowInFlight(_))
    ));
    assert!(matches!(
        h.manager.delete_mod(&foo),
        Err(ManagerError::WorkflowInFlight(_))
    ));

    let batch = h.manager.update_mods().unwrap();
    assert_eq!(batch.handles.len(), 1);
    assert_eq!(batch.handles[0].mod_id(), &bar);
    assert_eq!(batch.rejected.len(), 1);
    assert_eq!(batch.rejected[0].0, foo);
    assert!(matches!(
        batch.rejected[0].1,
        ManagerError::WorkflowInFlight(_)
    ));

    h.site.gate.open();
    assert!(running.wait().await.is_success());
    for handle in batch.handles {
        assert!(handle.wait().await.is_success());
    }

    // Released once finished.
    assert!(h.manager.update_mod(&foo).unwrap().wait().await.is_success());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_download_commits_nothing() {
    let mut h = Harness::new(ConflictPolicy::Abort);
    let page = h.site.publish("foo", "1.0", 1, FOO_FILES);
    h.site.gate_download(&page);

    let handle = h.manager.add_new_mod(&page).unwrap();
    let id = handle.mod_id().clone();
    h.site.wait_for_blocked_fetch().await;
    handle.cancel();
    h.site.gate.open();

    assert!(handle.wait().await.is_cancelled());
    assert!(matches!(
        h.manager.find_mod(&id),
        Err(ManagerError::ModNotFound(_))
    ));
    assert!(!h.config.archive_path("foo-1.0.zip").exists());
    assert!(mod_changes(&h.drain_events()).is_empty());

    assert!(h.config.staging_path(&id).exists());
    assert_eq!(h.manager.cleanup_staging().unwrap(), 1);
    assert!(!h.config.staging_path(&id).exists());
}

// ============================================================================
// Pools
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_download_concurrency_is_bounded() {
    let h = Harness::build(ConflictPolicy::Abort, 2, None);
    h.site.set_delay(Duration::from_millis(50));

    let handles: Vec<_> = (0..6)
        .map(|n| {
            let page = h.site.publish(&format!("mod{}", n), "1.0", 1, FOO_FILES);
            h.manager.add_new_mod(&page).unwrap()
        })
        .collect();
    for handle in handles {
        assert!(handle.wait().await.is_success());
    }

    assert_eq!(h.manager.mods().unwrap().len(), 6);
    let max = h.site.max_active.load(Ordering::SeqCst);
    assert!((1..=2).contains(&max), "max concurrent fetches: {}", max);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_filesystem_workflows_run_in_submission_order() {
    let mut h = Harness::new(ConflictPolicy::Abort);
    let mut ids = Vec::new();
    for n in 0..4 {
        let path = format!("GameData/Mod{}/file.cfg", n);
        let page = h
            .site
            .publish(&format!("mod{}", n), "1.0", 1, &[(path.as_str(), b"x")]);
        ids.push(h.add(&page).await);
    }
    h.drain_events();

    let handles: Vec<_> = ids
        .iter()
        .rev()
        .map(|id| h.manager.enable_mod(id).unwrap())
        .collect();
    for handle in handles {
        assert!(handle.wait().await.is_success());
    }

    let order: Vec<ModId> = finished(&h.drain_events())
        .into_iter()
        .map(|(kind, id)| {
            assert_eq!(kind, WorkflowKind::Enable);
            id
        })
        .collect();
    let expected: Vec<ModId> = ids.into_iter().rev().collect();
    assert_eq!(order, expected);
}

// ============================================================================
// Conflicts
// ============================================================================

const SHARED: &str = "Shared/lib.dll";

async fn two_mods_sharing_a_path(h: &Harness, same_bytes: bool) -> (ModId, ModId) {
    let bar_bytes: &[u8] = if same_bytes { b"foo lib" } else { b"bar lib" };
    let foo = h
        .add(&h.site.publish(
            "foo",
            "1.0",
            1,
            &[
                ("GameData/Shared/lib.dll", b"foo lib"),
                ("GameData/Foo/a.cfg", b"a"),
            ],
        ))
        .await;
    let bar = h
        .add(&h.site.publish(
            "bar",
            "1.0",
            1,
            &[
                ("GameData/Shared/lib.dll", bar_bytes),
                ("GameData/Bar/b.cfg", b"b"),
            ],
        ))
        .await;
    h.enable(&foo).await;
    (foo, bar)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_conflict_abort_writes_nothing() {
    let h = Harness::new(ConflictPolicy::Abort);
    let (foo, bar) = two_mods_sharing_a_path(&h, false).await;

    let outcome = h.manager.enable_mod(&bar).unwrap().wait().await;
    assert!(outcome.is_failed());
    assert!(outcome.failure().unwrap().contains("lib.dll"));

    assert!(!h.installed("Bar/b.cfg").exists());
    assert_eq!(fs::read(h.installed(SHARED)).unwrap(), b"foo lib");
    assert!(!h.manager.find_mod(&bar).unwrap().enabled);
    assert_eq!(h.owner(SHARED), Some((foo, vec![])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_conflict_overwrite_transfers_ownership() {
    let h = Harness::new(ConflictPolicy::Overwrite);
    let (foo, bar) = two_mods_sharing_a_path(&h, false).await;

    h.enable(&bar).await;
    assert_eq!(fs::read(h.installed(SHARED)).unwrap(), b"bar lib");
    assert_eq!(h.owner(SHARED), Some((bar.clone(), vec![foo.clone()])));

    h.disable(&bar).await;
    assert!(h.installed(SHARED).exists());
    assert!(!h.installed("Bar/b.cfg").exists());
    assert_eq!(h.owner(SHARED), Some((foo.clone(), vec![])));

    h.disable(&foo).await;
    assert!(!h.installed(SHARED).exists());
    assert_eq!(h.owner(SHARED), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_conflict_keep_shares_existing_file() {
    let h = Harness::new(ConflictPolicy::Keep);
    let (foo, bar) = two_mods_sharing_a_path(&h, false).await;

    h.enable(&bar).await;
    assert_eq!(fs::read(h.installed(SHARED)).unwrap(), b"foo lib");
    assert!(h.installed("Bar/b.cfg").is_file());
    assert_eq!(h.owner(SHARED), Some((foo.clone(), vec![bar.clone()])));

    h.disable(&foo).await;
    assert!(h.installed(SHARED).exists());
    assert!(!h.installed("Foo/a.cfg").exists());
    assert_eq!(h.owner(SHARED), Some((bar, vec![])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_identical_files_never_ask() {
    let resolver = Arc::new(CountingResolver {
        decision: ConflictDecision::Abort,
        asked: AtomicUsize::new(0),
    });
    let h = Harness::build(ConflictPolicy::Abort, 4, Some(resolver.clone()));
    let (foo, bar) = two_mods_sharing_a_path(&h, true).await;

    h.enable(&bar).await;
    assert_eq!(resolver.asked.load(Ordering::SeqCst), 0);
    assert_eq!(h.owner(SHARED), Some((foo, vec![bar])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_conflict_answered_by_prompt() {
    let (prompt, mut requests) = ChannelPrompt::new();
    let resolver = Arc::new(PromptResolver::new(prompt, ConflictPolicy::Abort));
    let h = Harness::build(ConflictPolicy::Ask, 4, Some(resolver));
    let (foo, bar) = two_mods_sharing_a_path(&h, false).await;

    let answered = tokio::spawn(async move {
        let request = requests.recv().await.unwrap();
        let conflict = request.conflict.clone();
        request.respond(ConflictDecision::Overwrite);
        conflict
    });

    h.enable(&bar).await;
    let conflict = answered.await.unwrap();
    assert_eq!(conflict.path, PathBuf::from(SHARED));
    assert_eq!(conflict.existing_owner, Some(foo));
    assert_eq!(conflict.candidate, bar);
    assert_eq!(fs::read(h.installed(SHARED)).unwrap(), b"bar lib");
}
