//! Test doubles for the bridge ports
//!
//! Enabled with the `test-utils` feature. [`MemoryStorage`] models a small
//! directory tree with explicit modification times so incremental scans can
//! be driven deterministically: adding or removing a child bumps the direct
//! parent's modification time the way real filesystems do, while rewriting
//! a file's content does not.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::{BridgeError, Result};
use crate::storage::{FileMetadata, StorageAccess, StorageBackend, StorageEntry};
use crate::time::Clock;

#[derive(Debug, Clone)]
struct MemoryNode {
    is_directory: bool,
    content: Vec<u8>,
    modified_at: i64,
}

/// In-memory `/`-separated tree implementing [`StorageAccess`]
#[derive(Default)]
pub struct MemoryStorage {
    nodes: Mutex<BTreeMap<String, MemoryNode>>,
    failing_listings: Mutex<HashSet<String>>,
    failing_reads: Mutex<HashSet<String>>,
    inaccessible: Mutex<HashSet<String>>,
    listings: AtomicUsize,
    reads: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn parent_of(location: &str) -> Option<&str> {
    location
        .rsplit_once('/')
        .map(|(parent, _)| parent)
        .filter(|parent| !parent.is_empty())
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory (and any missing parents)
    pub fn add_dir(&self, location: &str, modified_at: i64) {
        let mut nodes = lock(&self.nodes);
        Self::ensure_dir(&mut nodes, location, modified_at);
    }

    /// Create or replace a file, creating parents as needed
    pub fn add_file(&self, location: &str, content: &[u8], modified_at: i64) {
        let mut nodes = lock(&self.nodes);
        if let Some(parent) = parent_of(location) {
            Self::ensure_dir(&mut nodes, parent, modified_at);
        }
        let created = !nodes.contains_key(location);
        nodes.insert(
            location.to_string(),
            MemoryNode {
                is_directory: false,
                content: content.to_vec(),
                modified_at,
            },
        );
        if created {
            Self::bump_parent(&mut nodes, location, modified_at);
        }
    }

    /// Rewrite a file in place (the parent directory keeps its time)
    pub fn set_file_content(&self, location: &str, content: &[u8], modified_at: i64) {
        let mut nodes = lock(&self.nodes);
        if let Some(node) = nodes.get_mut(location) {
            node.content = content.to_vec();
            node.modified_at = modified_at;
        }
    }

    /// Set a node's modification time without touching anything else
    pub fn touch(&self, location: &str, modified_at: i64) {
        if let Some(node) = lock(&self.nodes).get_mut(location) {
            node.modified_at = modified_at;
        }
    }

    /// Remove a node and its descendants
    pub fn remove(&self, location: &str, modified_at: i64) {
        let mut nodes = lock(&self.nodes);
        let prefix = format!("{location}/");
        nodes.retain(|key, _| key != location && !key.starts_with(&prefix));
        Self::bump_parent(&mut nodes, location, modified_at);
    }

    /// Make listings of `location` fail
    pub fn fail_listing(&self, location: &str) {
        lock(&self.failing_listings).insert(location.to_string());
    }

    /// Make content reads of `location` fail
    pub fn fail_reads(&self, location: &str) {
        lock(&self.failing_reads).insert(location.to_string());
    }

    /// Report `location` as inaccessible
    pub fn make_inaccessible(&self, location: &str) {
        lock(&self.inaccessible).insert(location.to_string());
    }

    /// Number of `list_entries` calls so far
    pub fn listing_count(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    /// Number of `open_read_stream` calls so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.listings.store(0, Ordering::SeqCst);
        self.reads.store(0, Ordering::SeqCst);
    }

    fn ensure_dir(nodes: &mut BTreeMap<String, MemoryNode>, location: &str, modified_at: i64) {
        if nodes.contains_key(location) {
            return;
        }
        if let Some(parent) = parent_of(location) {
            Self::ensure_dir(nodes, parent, modified_at);
        }
        nodes.insert(
            location.to_string(),
            MemoryNode {
                is_directory: true,
                content: Vec::new(),
                modified_at,
            },
        );
        Self::bump_parent(nodes, location, modified_at);
    }

    fn bump_parent(nodes: &mut BTreeMap<String, MemoryNode>, location: &str, modified_at: i64) {
        if let Some(parent) = parent_of(location).and_then(|p| nodes.get_mut(p)) {
            parent.modified_at = parent.modified_at.max(modified_at);
        }
    }
}

#[async_trait]
impl StorageAccess for MemoryStorage {
    async fn list_entries(&self, location: &str) -> Result<Vec<StorageEntry>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        if lock(&self.failing_listings).contains(location) {
            return Err(BridgeError::PermissionDenied(location.to_string()));
        }

        let nodes = lock(&self.nodes);
        match nodes.get(location) {
            Some(node) if node.is_directory => {}
            Some(_) => {
                return Err(BridgeError::OperationFailed(format!(
                    "Not a directory: {location}"
                )))
            }
            None => return Err(BridgeError::NotFound(location.to_string())),
        }

        let prefix = format!("{location}/");
        let entries = nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| !key[prefix.len()..].contains('/'))
            .map(|(key, node)| StorageEntry {
                name: key[prefix.len()..].to_string(),
                location: key.clone(),
                is_directory: node.is_directory,
                size: node.content.len() as u64,
                modified_at: Some(node.modified_at),
            })
            .collect();
        Ok(entries)
    }

    fn resolve_child(&self, parent: &str, name: &str) -> String {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }

    async fn check_accessible(&self, location: &str) -> bool {
        !lock(&self.inaccessible).contains(location) && lock(&self.nodes).contains_key(location)
    }

    async fn metadata(&self, location: &str) -> Result<FileMetadata> {
        lock(&self.nodes)
            .get(location)
            .map(|node| FileMetadata {
                size: node.content.len() as u64,
                modified_at: Some(node.modified_at),
                is_directory: node.is_directory,
            })
            .ok_or_else(|| BridgeError::NotFound(location.to_string()))
    }

    async fn open_read_stream(
        &self,
        location: &str,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if lock(&self.failing_reads).contains(location) {
            return Err(BridgeError::PermissionDenied(location.to_string()));
        }
        let content = lock(&self.nodes)
            .get(location)
            .filter(|node| !node.is_directory)
            .map(|node| node.content.clone())
            .ok_or_else(|| BridgeError::NotFound(location.to_string()))?;
        Ok(Box::new(std::io::Cursor::new(content)))
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Clock whose time only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listing_returns_direct_children_only() {
        let storage = MemoryStorage::new();
        storage.add_file("/books/a/01.mp3", b"one", 10);
        storage.add_file("/books/a/deep/02.mp3", b"two", 10);
        storage.add_file("/books/cover.jpg", b"img", 10);

        let mut names: Vec<_> = storage
            .list_entries("/books")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "cover.jpg"]);
        assert_eq!(storage.listing_count(), 1);
    }

    #[tokio::test]
    async fn test_adding_child_bumps_direct_parent_only() {
        let storage = MemoryStorage::new();
        storage.add_file("/books/a/01.mp3", b"one", 10);
        storage.add_file("/books/a/02.mp3", b"two", 20);

        assert_eq!(storage.metadata("/books/a").await.unwrap().modified_at, Some(20));
        assert_eq!(storage.metadata("/books").await.unwrap().modified_at, Some(10));

        storage.set_file_content("/books/a/01.mp3", b"changed", 30);
        assert_eq!(storage.metadata("/books/a").await.unwrap().modified_at, Some(20));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let storage = MemoryStorage::new();
        storage.add_file("/books/a/01.mp3", b"one", 10);
        storage.fail_listing("/books/a");
        storage.fail_reads("/books/a/01.mp3");
        storage.make_inaccessible("/books");

        assert!(storage.list_entries("/books/a").await.is_err());
        assert!(storage.open_read_stream("/books/a/01.mp3").await.is_err());
        assert!(!storage.check_accessible("/books").await);
        assert_eq!(storage.read_count(), 1);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        clock.advance(500);
        assert_eq!(clock.unix_timestamp_millis(), 1_500);
    }
}
