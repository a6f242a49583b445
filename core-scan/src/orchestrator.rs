//! # Incremental Scan Orchestrator
//!
//! Runs one scan pass over every configured root.
//!
//! ## Workflow
//!
//! 1. Compatibility check: a non-empty cache that shares no root with the
//!    configuration is discarded (storage paths moved) and the pass is forced.
//! 2. First-run check: no cached state, or no previous groups, forces the pass.
//! 3. Per root: an inaccessible root contributes nothing. An unchanged root
//!    carries its previous groups forward. Everything else is crawled,
//!    classified and grouped, and its files are checksummed.
//! 4. The new scan states are committed in one step, keeping cached states of
//!    removed roots only when a configured root extends them or vice versa.
//! 5. Fresh and carried groups are merged by location.
//!
//! Any error escaping the pass is answered by an unconditional full rescan.
//! Scan state is never partially committed.

use std::collections::HashSet;
use std::sync::Arc;

use bridge_traits::storage::StorageAccess;
use bridge_traits::time::Clock;
use core_library::models::{FolderScanState, Group, ScanStatistics};
use core_library::repositories::{
    ChecksumRepository, KeyValueChecksumRepository, KeyValueScanStateRepository,
    ScanStateRepository,
};
use core_runtime::config::{RootKind, ScanRoot, ScannerConfig};
use core_runtime::events::{CoreEvent, EventBus, PassMode, ScanEvent};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::checksum::ChecksumService;
use crate::classifier::StructureClassifier;
use crate::crawler::DirectoryCrawler;
use crate::error::{recovery_for, FailureSite, Recovery, Result};
use crate::filter::FolderFilter;
use crate::grouping::{group_external, group_library, merge_groups};
use crate::paths::is_within;
use crate::scan_state::{needs_scan, retain_for_roots, ScanStateTracker};

/// What a pass did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub mode: PassMode,
    /// Roots that were crawled
    pub rescanned: Vec<String>,
    /// Roots whose previous groups were carried forward
    pub skipped: Vec<String>,
    /// Roots that could not be accessed or listed
    pub unavailable: Vec<String>,
    /// Cached scan state and checksums were discarded first
    pub caches_reset: bool,
    /// The pass failed and this is the result of the recovery rescan
    pub recovered: bool,
    /// Scan state was written
    pub state_committed: bool,
}

impl ScanReport {
    fn new(mode: PassMode) -> Self {
        Self {
            mode,
            rescanned: Vec::new(),
            skipped: Vec::new(),
            unavailable: Vec::new(),
            caches_reset: false,
            recovered: false,
            state_committed: false,
        }
    }
}

/// Groups produced by a pass together with its report
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub groups: Vec<Group>,
    pub report: ScanReport,
}

/// Result of crawling one root
struct RootScan {
    groups: Vec<Group>,
    state: FolderScanState,
    files: Vec<String>,
}

pub struct IncrementalScanner {
    roots: Vec<ScanRoot>,
    recursive: bool,
    storage: Arc<dyn StorageAccess>,
    filter: Arc<FolderFilter>,
    crawler: DirectoryCrawler,
    classifier: StructureClassifier,
    states: ScanStateTracker,
    checksums: Option<ChecksumService>,
    clock: Arc<dyn Clock>,
    event_bus: Arc<EventBus>,
    pass_lock: Mutex<()>,
}

impl IncrementalScanner {
    /// Build a scanner whose caches live in the configured store
    pub fn new(config: &ScannerConfig, event_bus: Arc<EventBus>) -> Self {
        Self::with_repositories(
            config,
            event_bus,
            Arc::new(KeyValueScanStateRepository::new(config.store.clone())),
            Arc::new(KeyValueChecksumRepository::new(config.store.clone())),
        )
    }

    /// Build a scanner over explicit cache repositories
    pub fn with_repositories(
        config: &ScannerConfig,
        event_bus: Arc<EventBus>,
        scan_states: Arc<dyn ScanStateRepository>,
        checksums: Arc<dyn ChecksumRepository>,
    ) -> Self {
        let storage = config.storage.clone();
        let clock = config.clock.clone();
        let filter = Arc::new(FolderFilter::new(&config.filter));

        let checksums = config
            .verify_checksums
            .then(|| ChecksumService::new(storage.clone(), checksums, clock.clone()));

        Self {
            roots: config.roots.clone(),
            recursive: config.recursive,
            crawler: DirectoryCrawler::new(storage.clone(), filter.clone(), clock.clone()),
            classifier: StructureClassifier::new(storage.clone()),
            states: ScanStateTracker::new(storage.clone(), scan_states),
            storage,
            filter,
            checksums,
            clock,
            event_bus,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn crawler(&self) -> &DirectoryCrawler {
        &self.crawler
    }

    pub fn checksums(&self) -> Option<&ChecksumService> {
        self.checksums.as_ref()
    }

    /// Roots scanned by a pass: the library root plus unfiltered external roots
    pub fn active_roots(&self) -> Vec<ScanRoot> {
        let external: Vec<&str> = self
            .roots
            .iter()
            .filter(|root| root.is_external())
            .map(|root| root.location.as_str())
            .collect();
        let kept = self.filter.filter_roots(&external);

        self.roots
            .iter()
            .filter(|root| {
                let active = !root.is_external() || kept.contains(&root.location);
                if !active {
                    debug!(root = %root.location, "External root excluded by folder filter");
                }
                active
            })
            .cloned()
            .collect()
    }

    /// Scan and return the resulting groups
    pub async fn scan_incremental(&self, force: bool, previous: Option<&[Group]>) -> Vec<Group> {
        self.scan_incremental_with_report(force, previous)
            .await
            .groups
    }

    /// Scan and report what happened to every root
    pub async fn scan_incremental_with_report(
        &self,
        force: bool,
        previous: Option<&[Group]>,
    ) -> ScanOutcome {
        let _pass = self.pass_lock.lock().await;

        match self.run_pass(force, previous).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(
                    error = %err,
                    recovery = ?err.recovery(),
                    "Scan pass failed"
                );
                self.emit(ScanEvent::PassRecovered {
                    error: err.to_string(),
                });
                self.recovery_pass().await
            }
        }
    }

    /// Rescan every root regardless of cached state
    pub async fn force_full_scan(&self) -> ScanOutcome {
        self.scan_incremental_with_report(true, None).await
    }

    pub async fn scan_statistics(&self) -> Result<ScanStatistics> {
        let roots: Vec<String> = self
            .active_roots()
            .into_iter()
            .map(|root| root.location)
            .collect();
        self.states.statistics(&roots).await
    }

    /// Forget every cached scan state; the next pass is a full scan
    pub async fn clear_scan_states(&self) -> Result<()> {
        let _pass = self.pass_lock.lock().await;
        self.states.clear().await?;
        info!("Cleared scan states");
        Ok(())
    }

    #[instrument(skip(self, previous), fields(previous_groups = previous.map_or(0, |groups| groups.len())))]
    async fn run_pass(&self, force: bool, previous: Option<&[Group]>) -> Result<ScanOutcome> {
        let roots = self.active_roots();
        let root_locations: Vec<String> = roots.iter().map(|root| root.location.clone()).collect();
        let mut cached = self.states.load_all().await?;
        let mut report = ScanReport::new(if force {
            PassMode::ForcedFull
        } else {
            PassMode::Incremental
        });

        let compatible = cached.is_empty()
            || root_locations.is_empty()
            || root_locations.iter().any(|root| cached.contains_key(root));
        if !compatible {
            warn!(
                cached_roots = cached.len(),
                configured_roots = root_locations.len(),
                "Cached scan state shares no root with the configuration, resetting caches"
            );
            self.reset_caches().await?;
            cached.clear();
            report.caches_reset = true;
            report.mode = PassMode::ForcedFull;
            self.emit(ScanEvent::CachesReset {
                reason: "configured roots changed".to_string(),
            });
        }

        let previous = previous.unwrap_or_default();
        if cached.is_empty() || previous.is_empty() {
            if report.mode == PassMode::Incremental {
                info!(
                    cached_roots = cached.len(),
                    previous_groups = previous.len(),
                    "No usable previous state, scanning everything"
                );
            }
            report.mode = PassMode::ForcedFull;
        }
        let forced = report.mode == PassMode::ForcedFull;
        self.emit(ScanEvent::PassStarted { mode: report.mode });

        let now = self.clock.unix_timestamp_millis();
        let mut groups = Vec::new();
        let mut states = Vec::new();
        let mut pending = Vec::new();

        for root in &roots {
            if !self.storage.check_accessible(&root.location).await {
                self.mark_unavailable(root, &mut report);
                continue;
            }
            let current = self.modified_time(root).await;

            match cached.get(&root.location) {
                Some(state) if !needs_scan(Some(state), current, forced) => {
                    let carried: Vec<Group> = previous
                        .iter()
                        .filter(|group| is_within(&group.location, &root.location))
                        .cloned()
                        .collect();
                    debug!(root = %root.location, groups = carried.len(), "Root unchanged, carrying groups forward");
                    groups.extend(carried);
                    states.push(FolderScanState {
                        last_scan_time: now,
                        ..state.clone()
                    });
                    report.skipped.push(root.location.clone());
                    self.emit(ScanEvent::RootSkipped {
                        root: root.location.clone(),
                    });
                }
                _ => pending.push((root, current)),
            }
        }

        let mut discovered = HashSet::new();
        for scan in self.rescan_roots(pending, now, &mut report).await {
            discovered.extend(scan.files);
            states.push(scan.state);
            groups.extend(scan.groups);
        }

        states.extend(retain_for_roots(&cached, &root_locations));
        self.states.commit(&states).await?;
        report.state_committed = true;

        if forced && report.unavailable.is_empty() {
            if let Some(checksums) = &self.checksums {
                if let Err(err) = checksums.cleanup_missing_files(&discovered).await {
                    warn!(error = %err, "Checksum cleanup failed");
                }
            }
        }

        let groups = merge_groups(groups);
        info!(
            mode = %report.mode,
            groups = groups.len(),
            rescanned = report.rescanned.len(),
            skipped = report.skipped.len(),
            unavailable = report.unavailable.len(),
            "Scan pass completed"
        );
        self.emit(ScanEvent::PassCompleted {
            groups: groups.len(),
            rescanned: report.rescanned.len(),
            skipped: report.skipped.len(),
        });
        Ok(ScanOutcome { groups, report })
    }

    /// Full scan that never consults the caches
    async fn recovery_pass(&self) -> ScanOutcome {
        let mut report = ScanReport::new(PassMode::ForcedFull);
        report.recovered = true;
        let now = self.clock.unix_timestamp_millis();

        let roots = self.active_roots();
        let mut pending = Vec::new();
        for root in &roots {
            if self.storage.check_accessible(&root.location).await {
                pending.push((root, self.modified_time(root).await));
            } else {
                self.mark_unavailable(root, &mut report);
            }
        }

        let mut groups = Vec::new();
        let mut states = Vec::new();
        for scan in self.rescan_roots(pending, now, &mut report).await {
            states.push(scan.state);
            groups.extend(scan.groups);
        }

        match self.states.commit(&states).await {
            Ok(()) => report.state_committed = true,
            Err(err) => warn!(error = %err, "Recovery scan could not commit scan state"),
        }

        let groups = merge_groups(groups);
        info!(groups = groups.len(), rescanned = report.rescanned.len(), "Recovery scan completed");
        self.emit(ScanEvent::PassCompleted {
            groups: groups.len(),
            rescanned: report.rescanned.len(),
            skipped: 0,
        });
        ScanOutcome { groups, report }
    }

    /// Crawl roots concurrently; failed roots are reported unavailable
    async fn rescan_roots(
        &self,
        pending: Vec<(&ScanRoot, Option<i64>)>,
        now: i64,
        report: &mut ScanReport,
    ) -> Vec<RootScan> {
        let results = join_all(
            pending
                .iter()
                .map(|(root, current)| self.scan_root(root, *current, now)),
        )
        .await;

        let mut scans = Vec::with_capacity(results.len());
        for ((root, _), result) in pending.into_iter().zip(results) {
            match result {
                Ok(scan) => {
                    info!(
                        root = %root.location,
                        groups = scan.groups.len(),
                        files = scan.files.len(),
                        "Root scanned"
                    );
                    report.rescanned.push(root.location.clone());
                    self.emit(ScanEvent::RootScanned {
                        root: root.location.clone(),
                        groups: scan.groups.len(),
                        files: scan.files.len(),
                    });
                    scans.push(scan);
                }
                Err(err) => {
                    warn!(root = %root.location, error = %err, recovery = ?err.recovery(), "Root scan failed");
                    self.mark_unavailable(root, report);
                }
            }
        }
        scans
    }

    async fn scan_root(&self, root: &ScanRoot, current: Option<i64>, now: i64) -> Result<RootScan> {
        let crawl = self.crawler.crawl(&root.location, self.recursive).await?;
        let total_size = crawl.total_size();
        let files: Vec<String> = crawl
            .audio_files
            .iter()
            .map(|file| file.location.clone())
            .collect();

        let groups = match root.kind {
            RootKind::LibraryManaged => group_library(root, crawl.audio_files, &crawl.images, now),
            RootKind::External => {
                let structure = self.classifier.classify(&root.location).await?;
                group_external(root, structure, crawl.audio_files, &crawl.images, now)
            }
        };

        if let Some(checksums) = &self.checksums {
            for file in &files {
                if let Err(err) = checksums.compute_and_save(file).await {
                    match recovery_for(FailureSite::ChecksumRecompute) {
                        Recovery::SkipItem => {
                            warn!(file = %file, error = %err, "Checksum not saved");
                        }
                        _ => return Err(err),
                    }
                }
            }
        }

        Ok(RootScan {
            groups,
            state: FolderScanState {
                root_location: root.location.clone(),
                last_scan_time: now,
                last_modified_time: current.unwrap_or_default(),
                file_count: files.len(),
                total_size,
            },
            files,
        })
    }

    async fn modified_time(&self, root: &ScanRoot) -> Option<i64> {
        match self.states.current_modified_time(&root.location).await {
            Ok(modified) => modified,
            Err(err) => {
                warn!(root = %root.location, error = %err, "Cannot read root modification time");
                None
            }
        }
    }

    async fn reset_caches(&self) -> Result<()> {
        self.states.clear().await?;
        if let Some(checksums) = &self.checksums {
            checksums.clear().await?;
        }
        Ok(())
    }

    fn mark_unavailable(&self, root: &ScanRoot, report: &mut ScanReport) {
        warn!(
            root = %root.location,
            recovery = ?recovery_for(FailureSite::RootAccess),
            "Root unavailable"
        );
        report.unavailable.push(root.location.clone());
        self.emit(ScanEvent::RootUnavailable {
            root: root.location.clone(),
        });
    }

    fn emit(&self, event: ScanEvent) {
        self.event_bus.emit(CoreEvent::Scan(event)).ok();
    }
}
