//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{FileMetadata, StorageAccess, StorageBackend, StorageEntry},
};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::{debug, warn};

/// Tokio-based file system implementation
///
/// Locations are plain path strings. Symlinks are followed when reading
/// metadata, so a linked directory is walked like a real one.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Convert std::io::Error to BridgeError
    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }

    fn millis(time: std::io::Result<SystemTime>) -> Option<i64> {
        time.ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
    }
}

#[async_trait]
impl StorageAccess for TokioFileSystem {
    async fn list_entries(&self, location: &str) -> Result<Vec<StorageEntry>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(location).await.map_err(Self::map_io_error)?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(Self::map_io_error)?
        {
            let path = entry.path();
            let metadata = match fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    // Dangling symlinks and races with deletion end up here
                    warn!(path = ?path, error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            let is_directory = metadata.is_dir();
            entries.push(StorageEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                location: path.to_string_lossy().into_owned(),
                is_directory,
                size: if is_directory { 0 } else { metadata.len() },
                modified_at: Self::millis(metadata.modified()),
            });
        }

        debug!(path = location, count = entries.len(), "Listed directory");
        Ok(entries)
    }

    fn resolve_child(&self, parent: &str, name: &str) -> String {
        Path::new(parent).join(name).to_string_lossy().into_owned()
    }

    async fn check_accessible(&self, location: &str) -> bool {
        match fs::metadata(location).await {
            Ok(metadata) if metadata.is_dir() => fs::read_dir(location).await.is_ok(),
            Ok(_) => true,
            Err(_) => false,
        }
    }

    async fn metadata(&self, location: &str) -> Result<FileMetadata> {
        let metadata = fs::metadata(location).await.map_err(Self::map_io_error)?;

        Ok(FileMetadata {
            size: metadata.len(),
            modified_at: Self::millis(metadata.modified()),
            is_directory: metadata.is_dir(),
        })
    }

    async fn open_read_stream(
        &self,
        location: &str,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        let file = fs::File::open(location).await.map_err(Self::map_io_error)?;
        debug!(path = location, "Opened file for reading");
        Ok(Box::new(file))
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::FileSystem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_list_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        std::fs::create_dir(dir.path().join("Book")).unwrap();
        std::fs::write(dir.path().join("intro.mp3"), b"abc").unwrap();

        let fs = TokioFileSystem::new();
        let mut entries = fs.list_entries(&root).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Book");
        assert!(entries[0].is_directory);
        assert_eq!(entries[1].name, "intro.mp3");
        assert_eq!(entries[1].size, 3);
        assert!(entries[1].modified_at.is_some());
        assert_eq!(entries[1].location, fs.resolve_child(&root, "intro.mp3"));
    }

    #[tokio::test]
    async fn test_accessibility_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let fs = TokioFileSystem::new();

        assert!(fs.check_accessible(&root).await);
        assert!(!fs.check_accessible(&fs.resolve_child(&root, "missing")).await);
        assert!(fs.metadata(&root).await.unwrap().is_directory);
        assert!(fs.list_entries(&fs.resolve_child(&root, "missing")).await.is_err());
    }

    #[tokio::test]
    async fn test_read_stream() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("01.mp3");
        std::fs::write(&file, b"Hello, World!").unwrap();

        let fs = TokioFileSystem::new();
        let mut stream = fs.open_read_stream(&file.to_string_lossy()).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"Hello, World!");
    }
}
