//! Document Tree Storage Adapter
//!
//! Mobile and sandboxed hosts hand the core a permission-scoped folder
//! handle instead of a path. Children are reached by querying the host with
//! opaque document URIs. [`DocumentTreeStorage`] adapts such a host to the
//! [`StorageAccess`] port so the scanner can walk it like any other tree.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{BridgeError, Result};
use crate::storage::{FileMetadata, StorageAccess, StorageBackend, StorageEntry};

/// MIME type document trees use to mark directories
pub const DIRECTORY_MIME_TYPE: &str = "vnd.android.document/directory";

/// A document as reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNode {
    pub uri: String,
    pub display_name: String,
    pub mime_type: String,
    pub size: u64,
    /// Last modification time in Unix milliseconds
    pub last_modified: Option<i64>,
}

impl DocumentNode {
    pub fn is_directory(&self) -> bool {
        self.mime_type == DIRECTORY_MIME_TYPE
    }
}

/// Host-side document tree API
///
/// Implemented by the platform layer (e.g. over a content resolver). All
/// URIs are opaque to the core.
#[async_trait]
pub trait DocumentTreeHost: Send + Sync {
    /// Children of the document at `uri`
    async fn query_children(&self, uri: &str) -> Result<Vec<DocumentNode>>;

    /// The document at `uri` itself
    async fn query_document(&self, uri: &str) -> Result<DocumentNode>;

    /// URI of the child called `name` under `parent_uri`
    fn child_uri(&self, parent_uri: &str, name: &str) -> String;

    /// Whether the persisted permission grant still covers `uri`
    async fn has_permission(&self, uri: &str) -> bool;

    /// Open the document content for reading
    async fn open_document(&self, uri: &str)
        -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
}

/// [`StorageAccess`] implementation over a [`DocumentTreeHost`]
pub struct DocumentTreeStorage {
    host: Arc<dyn DocumentTreeHost>,
}

impl DocumentTreeStorage {
    pub fn new(host: Arc<dyn DocumentTreeHost>) -> Self {
        Self { host }
    }

    fn to_entry(node: DocumentNode) -> StorageEntry {
        let is_directory = node.is_directory();
        StorageEntry {
            name: node.display_name,
            location: node.uri,
            is_directory,
            size: if is_directory { 0 } else { node.size },
            modified_at: node.last_modified,
        }
    }
}

#[async_trait]
impl StorageAccess for DocumentTreeStorage {
    async fn list_entries(&self, location: &str) -> Result<Vec<StorageEntry>> {
        if !self.host.has_permission(location).await {
            return Err(BridgeError::PermissionDenied(location.to_string()));
        }
        let nodes = self.host.query_children(location).await?;
        Ok(nodes.into_iter().map(Self::to_entry).collect())
    }

    fn resolve_child(&self, parent: &str, name: &str) -> String {
        self.host.child_uri(parent, name)
    }

    async fn check_accessible(&self, location: &str) -> bool {
        if !self.host.has_permission(location).await {
            return false;
        }
        self.host.query_document(location).await.is_ok()
    }

    async fn metadata(&self, location: &str) -> Result<FileMetadata> {
        let node = self.host.query_document(location).await?;
        Ok(FileMetadata {
            size: node.size,
            modified_at: node.last_modified,
            is_directory: node.is_directory(),
        })
    }

    async fn open_read_stream(
        &self,
        location: &str,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        self.host.open_document(location).await
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::DocumentTree
    }
}
