//! Storage Access Abstractions
//!
//! Provides the platform-agnostic port the scanner uses to walk a media
//! library. Two very different backends sit behind it:
//! - Conventional filesystems, where a location is a path string
//! - Document trees (permission-scoped folder handles), where a location is
//!   an opaque URI handed out by the host
//!
//! The core never parses or builds locations itself. It only lists
//! directories, reads metadata and asks the backend to join a display name
//! onto a parent location.

use async_trait::async_trait;

use crate::error::Result;

/// Which kind of backend produced a location
///
/// Only used for log context. Scanning logic never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Direct path access
    FileSystem,
    /// Host-mediated document tree
    DocumentTree,
    /// In-memory tree (tests)
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileSystem => "filesystem",
            Self::DocumentTree => "document-tree",
            Self::Memory => "memory",
        }
    }
}

/// One child returned by a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    /// Display name (last segment)
    pub name: String,
    /// Opaque location of the entry
    ///
    /// Backends that only report names may leave this empty; callers then
    /// derive it with [`StorageAccess::resolve_child`].
    pub location: String,
    pub is_directory: bool,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Last modification time in Unix milliseconds, when known
    pub modified_at: Option<i64>,
}

impl StorageEntry {
    pub fn file(name: impl Into<String>, location: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            is_directory: false,
            size,
            modified_at: None,
        }
    }

    pub fn directory(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            is_directory: true,
            size: 0,
            modified_at: None,
        }
    }

    pub fn with_modified_at(mut self, modified_at: i64) -> Self {
        self.modified_at = Some(modified_at);
        self
    }
}

/// File metadata information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub size: u64,
    /// Last modification time in Unix milliseconds
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// Storage access trait
///
/// Abstracts directory listing and file reads so the scanner works the same
/// over a desktop filesystem and a platform document tree.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::StorageAccess;
///
/// async fn count_children(storage: &dyn StorageAccess, root: &str) -> Result<usize> {
///     Ok(storage.list_entries(root).await?.len())
/// }
/// ```
#[async_trait]
pub trait StorageAccess: Send + Sync {
    /// List the immediate children of a directory
    async fn list_entries(&self, location: &str) -> Result<Vec<StorageEntry>>;

    /// Location of the child called `name` inside `parent`
    fn resolve_child(&self, parent: &str, name: &str) -> String;

    /// Whether the location exists and can currently be read
    async fn check_accessible(&self, location: &str) -> bool;

    /// Get metadata for a file or directory
    async fn metadata(&self, location: &str) -> Result<FileMetadata>;

    /// Open a file for streaming reads
    async fn open_read_stream(
        &self,
        location: &str,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;

    /// Backend kind, for diagnostics
    fn backend(&self) -> StorageBackend;
}
