//! Per-root scan-state cache
//!
//! A root needs a re-crawl when it has no cached state, when its directory
//! modification time moved past the cached one, or when a rescan is forced.
//! Directory times are a coarse signal: nested edits do not always touch the
//! root, which is why a forced rescan is always available.

use std::collections::HashMap;
use std::sync::Arc;

use bridge_traits::storage::StorageAccess;
use core_library::models::{FolderScanState, ScanStatistics};
use core_library::repositories::ScanStateRepository;
use tracing::debug;

use crate::error::Result;
use crate::paths::is_path_extension;

/// Whether a root must be re-crawled
pub fn needs_scan(cached: Option<&FolderScanState>, current_modified: Option<i64>, force: bool) -> bool {
    if force {
        return true;
    }
    match (cached, current_modified) {
        (None, _) => true,
        (Some(_), None) => true,
        (Some(state), Some(modified)) => modified > state.last_modified_time,
    }
}

/// Cached states worth keeping across a configuration change
///
/// A state survives when its root is not configured any more but is a path
/// extension of a configured root (or the other way round). States of
/// configured roots are expected to be rebuilt by the caller.
pub fn retain_for_roots(
    cached: &HashMap<String, FolderScanState>,
    current_roots: &[String],
) -> Vec<FolderScanState> {
    cached
        .values()
        .filter(|state| !current_roots.contains(&state.root_location))
        .filter(|state| {
            let keep = current_roots
                .iter()
                .any(|root| is_path_extension(&state.root_location, root));
            if !keep {
                debug!(root = %state.root_location, "Pruning scan state of removed root");
            }
            keep
        })
        .cloned()
        .collect()
}

pub struct ScanStateTracker {
    storage: Arc<dyn StorageAccess>,
    repository: Arc<dyn ScanStateRepository>,
}

impl ScanStateTracker {
    pub fn new(storage: Arc<dyn StorageAccess>, repository: Arc<dyn ScanStateRepository>) -> Self {
        Self {
            storage,
            repository,
        }
    }

    /// Every cached state keyed by root location
    pub async fn load_all(&self) -> Result<HashMap<String, FolderScanState>> {
        Ok(self
            .repository
            .list()
            .await?
            .into_iter()
            .map(|state| (state.root_location.clone(), state))
            .collect())
    }

    /// Modification time of the root directory, when the backend reports one
    pub async fn current_modified_time(&self, root: &str) -> Result<Option<i64>> {
        Ok(self.storage.metadata(root).await?.modified_at)
    }

    /// Replace the cache with `states` in one step
    pub async fn commit(&self, states: &[FolderScanState]) -> Result<()> {
        self.repository.replace_all(states).await?;
        debug!(roots = states.len(), "Committed scan states");
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.repository.clear().await?;
        Ok(())
    }

    /// Summarize the cache for the given roots
    pub async fn statistics(&self, roots: &[String]) -> Result<ScanStatistics> {
        let cached = self.load_all().await?;
        let mut stats = ScanStatistics {
            total_folders: roots.len(),
            ..ScanStatistics::default()
        };

        for root in roots {
            let state = cached.get(root);
            let current = self.current_modified_time(root).await.ok().flatten();
            if needs_scan(state, current, false) {
                stats.folders_needing_scan += 1;
            }

            let Some(state) = state else { continue };
            stats.folders_scanned += 1;
            stats.total_files += state.file_count;
            stats.total_size += state.total_size;
            stats.oldest_scan = Some(
                stats
                    .oldest_scan
                    .map_or(state.last_scan_time, |t| t.min(state.last_scan_time)),
            );
            stats.newest_scan = Some(
                stats
                    .newest_scan
                    .map_or(state.last_scan_time, |t| t.max(state.last_scan_time)),
            );
        }
        Ok(stats)
    }
}
