//! Structure classifier
//!
//! Looks at the shape of an external root and decides how its files should be
//! grouped. The inspection samples a few subdirectories instead of walking
//! the whole tree, so a root whose first subdirectories are unrepresentative
//! (empty placeholders, say) can be misread as `Arbitrary`.

use std::sync::Arc;

use bridge_traits::storage::{StorageAccess, StorageEntry};
use core_library::models::FolderStructureType;
use core_library::ordering::compare_segment;
use tracing::{debug, warn};

use crate::crawler::is_audio_name;
use crate::error::{Result, ScanError};

/// First-level subdirectories inspected for audio
const FIRST_LEVEL_SAMPLE: usize = 3;
/// Second-level subdirectories inspected for audio
const SECOND_LEVEL_SAMPLE: usize = 2;

#[derive(Debug, Default)]
struct Children {
    directories: Vec<StorageEntry>,
    audio_files: usize,
}

pub struct StructureClassifier {
    storage: Arc<dyn StorageAccess>,
}

impl StructureClassifier {
    pub fn new(storage: Arc<dyn StorageAccess>) -> Self {
        Self { storage }
    }

    /// Classify the layout beneath `root`
    ///
    /// # Errors
    /// Fails only when the root itself cannot be listed.
    pub async fn classify(&self, root: &str) -> Result<FolderStructureType> {
        let children = self.children(root).await.map_err(|error| {
            warn!(root, error = %error, "Cannot list root");
            ScanError::RootUnavailable {
                root: root.to_string(),
            }
        })?;

        let structure = match (children.audio_files > 0, !children.directories.is_empty()) {
            (true, true) => FolderStructureType::Arbitrary,
            (true, false) => FolderStructureType::SingleFolder,
            (false, true) => self.classify_nested(&children.directories).await,
            (false, false) => FolderStructureType::Arbitrary,
        };

        debug!(root, structure = %structure, "Classified root");
        Ok(structure)
    }

    async fn classify_nested(&self, directories: &[StorageEntry]) -> FolderStructureType {
        let mut any_audio = false;
        for directory in directories.iter().take(FIRST_LEVEL_SAMPLE) {
            if self.contains_audio(directory).await {
                any_audio = true;
                break;
            }
        }
        if !any_audio {
            return FolderStructureType::Arbitrary;
        }

        let first = self.children_or_empty(&directories[0]).await;
        if first.directories.is_empty() {
            return FolderStructureType::RootWithSubfolders;
        }

        for second in first.directories.iter().take(SECOND_LEVEL_SAMPLE) {
            if self.children_or_empty(second).await.audio_files > 0 {
                return FolderStructureType::AuthorBookStructure;
            }
        }
        FolderStructureType::Arbitrary
    }

    /// Audio directly inside `directory` or inside one of its first subdirectories
    async fn contains_audio(&self, directory: &StorageEntry) -> bool {
        let children = self.children_or_empty(directory).await;
        if children.audio_files > 0 {
            return true;
        }
        for nested in children.directories.iter().take(SECOND_LEVEL_SAMPLE) {
            if self.children_or_empty(nested).await.audio_files > 0 {
                return true;
            }
        }
        false
    }

    async fn children_or_empty(&self, directory: &StorageEntry) -> Children {
        match self.children(&directory.location).await {
            Ok(children) => children,
            Err(error) => {
                warn!(folder = %directory.location, error = %error, "Cannot inspect folder, treating it as empty");
                Children::default()
            }
        }
    }

    async fn children(&self, location: &str) -> bridge_traits::error::Result<Children> {
        let mut children = Children::default();
        for mut entry in self.storage.list_entries(location).await? {
            if entry.location.is_empty() {
                entry.location = self.storage.resolve_child(location, &entry.name);
            }
            if entry.is_directory {
                children.directories.push(entry);
            } else if is_audio_name(&entry.name) {
                children.audio_files += 1;
            }
        }
        children
            .directories
            .sort_by(|a, b| compare_segment(&a.name, &b.name).then_with(|| a.name.cmp(&b.name)));
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::testing::MemoryStorage;

    async fn classify(storage: MemoryStorage, root: &str) -> FolderStructureType {
        StructureClassifier::new(Arc::new(storage))
            .classify(root)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_single_folder() {
        let storage = MemoryStorage::new();
        storage.add_file("/ext/01.mp3", b"", 1);
        storage.add_file("/ext/02.mp3", b"", 1);
        storage.add_file("/ext/cover.jpg", b"", 1);

        assert_eq!(classify(storage, "/ext").await, FolderStructureType::SingleFolder);
    }

    #[tokio::test]
    async fn test_mixed_root_is_arbitrary() {
        let storage = MemoryStorage::new();
        storage.add_file("/ext/01.mp3", b"", 1);
        storage.add_file("/ext/Book/01.mp3", b"", 1);

        assert_eq!(classify(storage, "/ext").await, FolderStructureType::Arbitrary);
    }

    #[tokio::test]
    async fn test_root_with_subfolders() {
        let storage = MemoryStorage::new();
        storage.add_file("/ext/Book A/01.mp3", b"", 1);
        storage.add_file("/ext/Book B/01.mp3", b"", 1);

        assert_eq!(
            classify(storage, "/ext").await,
            FolderStructureType::RootWithSubfolders
        );
    }

    #[tokio::test]
    async fn test_author_book_structure() {
        let storage = MemoryStorage::new();
        storage.add_file("/ext/Author A/Book One/01.mp3", b"", 1);
        storage.add_file("/ext/Author A/Book Two/01.mp3", b"", 1);

        assert_eq!(
            classify(storage, "/ext").await,
            FolderStructureType::AuthorBookStructure
        );
    }

    #[tokio::test]
    async fn test_three_levels_is_arbitrary() {
        let storage = MemoryStorage::new();
        storage.add_file("/ext/Series/Author/Book/01.mp3", b"", 1);

        assert_eq!(classify(storage, "/ext").await, FolderStructureType::Arbitrary);
    }

    #[tokio::test]
    async fn test_first_folder_with_empty_subfolders_is_arbitrary() {
        let storage = MemoryStorage::new();
        storage.add_file("/ext/A/01.mp3", b"", 1);
        storage.add_file("/ext/A/Extras/notes.txt", b"", 1);
        storage.add_file("/ext/A/Scans/page1.jpg", b"", 1);
        storage.add_file("/ext/B/01.mp3", b"", 1);

        assert_eq!(classify(storage, "/ext").await, FolderStructureType::Arbitrary);
    }

    #[tokio::test]
    async fn test_empty_root_is_arbitrary() {
        let storage = MemoryStorage::new();
        storage.add_dir("/ext", 1);
        storage.add_file("/ext/readme.txt", b"", 1);

        assert_eq!(classify(storage, "/ext").await, FolderStructureType::Arbitrary);
    }

    #[tokio::test]
    async fn test_sampling_only_looks_at_first_three_folders() {
        let storage = MemoryStorage::new();
        storage.add_dir("/ext/1 empty", 1);
        storage.add_dir("/ext/2 empty", 1);
        storage.add_dir("/ext/3 empty", 1);
        storage.add_file("/ext/4 Book/01.mp3", b"", 1);

        assert_eq!(classify(storage, "/ext").await, FolderStructureType::Arbitrary);
    }

    #[tokio::test]
    async fn test_unreadable_root_is_an_error() {
        let storage = MemoryStorage::new();
        storage.add_dir("/ext", 1);
        storage.fail_listing("/ext");

        let result = StructureClassifier::new(Arc::new(storage)).classify("/ext").await;
        assert!(matches!(result, Err(ScanError::RootUnavailable { .. })));
    }
}
