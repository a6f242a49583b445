//! Core service façade and bootstrap helpers.
//!
//! This crate wires a [`ScannerConfig`] (storage port, key-value store,
//! clock) into the scanner and keeps the stored group snapshot in step with
//! every pass. Desktop hosts typically enable the `desktop-shims` feature,
//! which supplies the filesystem adapter and a SQLite-backed store from
//! `bridge-desktop`.

pub mod error;

pub use error::{CoreError, Result};

use std::collections::HashSet;
use std::sync::Arc;

use core_library::models::{AudioEntry, Group, ScanStatistics};
use core_library::repositories::{GroupRepository, KeyValueGroupRepository};
use core_runtime::config::ScannerConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, LibraryEvent, PassMode};
use core_scan::paths::is_within;
use core_scan::{IncrementalScanner, ScanOutcome};
use tracing::{debug, info};

#[cfg(feature = "desktop-shims")]
use bridge_desktop::SqliteKeyValueStore;
#[cfg(feature = "desktop-shims")]
use bridge_traits::persistence::KeyValueStore;

/// Primary façade exposed to host applications.
pub struct LibraryScanService {
    scanner: IncrementalScanner,
    groups: Arc<dyn GroupRepository>,
    event_bus: Arc<EventBus>,
}

impl LibraryScanService {
    /// Create a service whose groups live in the configured store.
    pub fn new(config: ScannerConfig) -> Result<Self> {
        let groups = Arc::new(KeyValueGroupRepository::new(config.store.clone()));
        Self::with_group_repository(config, groups)
    }

    /// Create a service over an explicit group repository.
    pub fn with_group_repository(
        config: ScannerConfig,
        groups: Arc<dyn GroupRepository>,
    ) -> Result<Self> {
        config.validate()?;

        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));
        let scanner = IncrementalScanner::new(&config, event_bus.clone());
        info!(
            roots = config.roots.len(),
            backend = config.storage.backend().as_str(),
            "Library scan service ready"
        );

        Ok(Self {
            scanner,
            groups,
            event_bus,
        })
    }

    /// Run a pass against the given previous groups and persist the result.
    pub async fn scan_incremental(
        &self,
        force: bool,
        previous: Option<&[Group]>,
    ) -> Result<ScanOutcome> {
        let outcome = self
            .scanner
            .scan_incremental_with_report(force, previous)
            .await;
        self.persist(&outcome).await?;
        Ok(outcome)
    }

    /// Run a pass using the stored groups as the previous result.
    pub async fn scan_from_store(&self, force: bool) -> Result<ScanOutcome> {
        let previous = self.groups.list().await?;
        self.scan_incremental(force, Some(previous.as_slice())).await
    }

    /// Rescan every root and replace the stored groups.
    pub async fn force_full_scan(&self) -> Result<ScanOutcome> {
        let outcome = self.scanner.force_full_scan().await;
        self.persist(&outcome).await?;
        Ok(outcome)
    }

    pub async fn scan_statistics(&self) -> Result<ScanStatistics> {
        Ok(self.scanner.scan_statistics().await?)
    }

    /// Forget every cached scan state; the next pass rescans everything.
    pub async fn clear_scan_states(&self) -> Result<()> {
        self.scanner.clear_scan_states().await?;
        self.event_bus
            .emit(CoreEvent::Library(LibraryEvent::ScanStatesCleared))
            .ok();
        Ok(())
    }

    /// The persisted group snapshot in location order.
    pub async fn stored_groups(&self) -> Result<Vec<Group>> {
        Ok(self.groups.list().await?)
    }

    /// Playable files directly inside `location`, in natural order.
    pub async fn playable_files(&self, location: &str) -> Result<Vec<AudioEntry>> {
        Ok(self.scanner.crawler().list_playable_files(location).await?)
    }

    /// Subscribe to scan and library events.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// Mirror a pass into the group store.
    ///
    /// Forced passes replace the whole snapshot. Incremental passes rewrite
    /// the groups of re-crawled roots and drop the ones that vanished there;
    /// groups of skipped or unavailable roots are left alone.
    async fn persist(&self, outcome: &ScanOutcome) -> Result<()> {
        let stored = self.groups.list().await?;
        let (written, removed) = if outcome.report.mode == PassMode::ForcedFull {
            let current: HashSet<&str> =
                outcome.groups.iter().map(|g| g.location.as_str()).collect();
            let removed = stored
                .iter()
                .filter(|g| !current.contains(g.location.as_str()))
                .count();
            self.groups.replace_all(&outcome.groups).await?;
            (outcome.groups.len(), removed)
        } else {
            let rescanned = &outcome.report.rescanned;
            let in_rescanned =
                |location: &str| rescanned.iter().any(|root| is_within(location, root));

            let fresh: Vec<Group> = outcome
                .groups
                .iter()
                .filter(|g| in_rescanned(g.location.as_str()))
                .cloned()
                .collect();
            self.groups.save_all(&fresh).await?;

            let current: HashSet<&str> = fresh.iter().map(|g| g.location.as_str()).collect();
            let mut removed = 0;
            for group in stored
                .iter()
                .filter(|g| in_rescanned(g.location.as_str()) && !current.contains(g.location.as_str()))
            {
                if self.groups.delete(&group.location).await? {
                    removed += 1;
                }
            }
            (fresh.len(), removed)
        };

        debug!(written, removed, "Persisted groups");
        self.event_bus
            .emit(CoreEvent::Library(LibraryEvent::GroupsPersisted {
                stored: written,
                removed,
            }))
            .ok();
        Ok(())
    }
}

/// Open the desktop SQLite store, at `path` or the default data location.
#[cfg(feature = "desktop-shims")]
pub async fn open_desktop_store(
    path: Option<std::path::PathBuf>,
) -> Result<Arc<dyn KeyValueStore>> {
    let path = path.unwrap_or_else(SqliteKeyValueStore::default_location);
    let store = SqliteKeyValueStore::new(path)
        .await
        .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;
    Ok(Arc::new(store))
}
