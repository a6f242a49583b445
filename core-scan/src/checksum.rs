//! Per-file checksum cache
//!
//! Change checks compare the cheap signature (size and modification time)
//! first. The file is hashed only to refresh a stale record or when the
//! signature still matches and the digest has to be compared.

use std::collections::HashSet;
use std::sync::Arc;

use bridge_traits::storage::StorageAccess;
use bridge_traits::time::Clock;
use core_library::models::FileChecksumRecord;
use core_library::repositories::ChecksumRepository;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::error::{recovery_for, FailureSite, Recovery, Result, ScanError};

const READ_CHUNK_SIZE: usize = 64 * 1024;

fn check_failed(location: &str, error: &dyn std::fmt::Display, context: &str) -> bool {
    let recovery = recovery_for(FailureSite::ChecksumCheck);
    warn!(file = %location, error = %error, recovery = ?recovery, "{context}");
    recovery == Recovery::ReportChanged
}

pub struct ChecksumService {
    storage: Arc<dyn StorageAccess>,
    repository: Arc<dyn ChecksumRepository>,
    clock: Arc<dyn Clock>,
}

impl ChecksumService {
    pub fn new(
        storage: Arc<dyn StorageAccess>,
        repository: Arc<dyn ChecksumRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            repository,
            clock,
        }
    }

    /// Whether the file changed since its checksum was recorded
    ///
    /// A failure answers whatever the checksum check policy says, which is
    /// to report the file as changed.
    pub async fn has_changed(&self, location: &str) -> bool {
        let metadata = match self.storage.metadata(location).await {
            Ok(metadata) => metadata,
            Err(error) => return check_failed(location, &error, "Cannot stat file"),
        };

        let cached = match self.repository.get(location).await {
            Ok(cached) => cached,
            Err(error) => return check_failed(location, &error, "Cannot read cached checksum"),
        };

        match cached {
            Some(record) if record.matches_signature(metadata.size, metadata.modified_at) => {
                match self.compute_digest(location).await {
                    Ok(digest) if digest == record.digest => false,
                    Ok(digest) => {
                        debug!(file = %location, "Content changed under an unchanged signature");
                        let refreshed = FileChecksumRecord {
                            digest,
                            computed_at: self.clock.unix_timestamp_millis(),
                            ..record
                        };
                        if let Err(error) = self.repository.save(&refreshed).await {
                            warn!(file = %location, error = %error, "Failed to store checksum");
                        }
                        true
                    }
                    Err(error) => check_failed(location, &error, "Cannot hash file"),
                }
            }
            _ => {
                if let Err(error) = self.compute_and_save(location).await {
                    warn!(file = %location, error = %error, "Failed to refresh checksum");
                }
                true
            }
        }
    }

    /// Hash the file and store the result
    pub async fn compute_and_save(&self, location: &str) -> Result<FileChecksumRecord> {
        let metadata = self.storage.metadata(location).await?;
        let digest = self.compute_digest(location).await?;
        let record = FileChecksumRecord {
            location: location.to_string(),
            digest,
            size: metadata.size,
            modified_at: metadata.modified_at,
            computed_at: self.clock.unix_timestamp_millis(),
        };
        self.repository.save(&record).await?;
        Ok(record)
    }

    /// SHA-256 of the file content as lowercase hex
    pub async fn compute_digest(&self, location: &str) -> Result<String> {
        let mut reader = self.storage.open_read_stream(location).await?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; READ_CHUNK_SIZE];

        loop {
            let read = reader
                .read(&mut buffer)
                .await
                .map_err(|error| ScanError::Checksum {
                    location: location.to_string(),
                    message: error.to_string(),
                })?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
            // Large files must not starve other tasks on the executor
            tokio::task::yield_now().await;
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    pub async fn remove(&self, location: &str) -> Result<bool> {
        Ok(self.repository.delete(location).await?)
    }

    /// Returns how many records were removed
    pub async fn remove_many(&self, locations: &[String]) -> Result<usize> {
        let mut removed = 0;
        for location in locations {
            if self.repository.delete(location).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Drop records for files outside `current_locations`
    pub async fn cleanup_missing_files(&self, current_locations: &HashSet<String>) -> Result<usize> {
        let stale: Vec<String> = self
            .repository
            .list()
            .await?
            .into_iter()
            .map(|record| record.location)
            .filter(|location| !current_locations.contains(location))
            .collect();

        let removed = self.remove_many(&stale).await?;
        if removed > 0 {
            debug!(removed, "Removed checksums of missing files");
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<()> {
        self.repository.clear().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::persistence::InMemoryKeyValueStore;
    use bridge_traits::testing::{ManualClock, MemoryStorage};
    use core_library::repositories::KeyValueChecksumRepository;
    use core_library::Result as LibraryResult;
    use mockall::mock;

    mock! {
        pub ChecksumRepo {}

        #[async_trait::async_trait]
        impl ChecksumRepository for ChecksumRepo {
            async fn get(&self, location: &str) -> LibraryResult<Option<FileChecksumRecord>>;
            async fn save(&self, record: &FileChecksumRecord) -> LibraryResult<()>;
            async fn delete(&self, location: &str) -> LibraryResult<bool>;
            async fn list(&self) -> LibraryResult<Vec<FileChecksumRecord>>;
            async fn replace_all(&self, records: &[FileChecksumRecord]) -> LibraryResult<()>;
            async fn clear(&self) -> LibraryResult<()>;
        }
    }

    fn service(storage: Arc<MemoryStorage>) -> ChecksumService {
        let repository = Arc::new(KeyValueChecksumRepository::new(Arc::new(
            InMemoryKeyValueStore::new(),
        )));
        ChecksumService::new(storage, repository, Arc::new(ManualClock::new(100)))
    }

    #[tokio::test]
    async fn test_digest_is_sha256_hex() {
        let storage = Arc::new(MemoryStorage::new());
        storage.add_file("/b/empty.mp3", b"", 1);
        storage.add_file("/b/abc.mp3", b"abc", 1);
        let service = service(storage);

        assert_eq!(
            service.compute_digest("/b/empty.mp3").await.unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            service.compute_digest("/b/abc.mp3").await.unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_unknown_file_is_changed_then_recorded() {
        let storage = Arc::new(MemoryStorage::new());
        storage.add_file("/b/1.mp3", b"audio", 5);
        let service = service(storage);

        assert!(service.has_changed("/b/1.mp3").await);
        assert!(!service.has_changed("/b/1.mp3").await);
    }

    #[tokio::test]
    async fn test_signature_change_skips_digest_comparison() {
        let storage = Arc::new(MemoryStorage::new());
        storage.add_file("/b/1.mp3", b"audio", 5);
        let service = service(storage.clone());
        service.compute_and_save("/b/1.mp3").await.unwrap();

        storage.set_file_content("/b/1.mp3", b"audio", 6);
        assert!(service.has_changed("/b/1.mp3").await);

        storage.set_file_content("/b/1.mp3", b"longer audio", 6);
        assert!(service.has_changed("/b/1.mp3").await);
    }

    #[tokio::test]
    async fn test_same_signature_compares_digest() {
        let storage = Arc::new(MemoryStorage::new());
        storage.add_file("/b/1.mp3", b"audio", 5);
        let service = service(storage.clone());
        service.compute_and_save("/b/1.mp3").await.unwrap();
        storage.reset_counters();

        assert!(!service.has_changed("/b/1.mp3").await);
        assert_eq!(storage.read_count(), 1);

        // Same size and time, different bytes
        storage.set_file_content("/b/1.mp3", b"AUDIO", 5);
        assert!(service.has_changed("/b/1.mp3").await);
        assert!(!service.has_changed("/b/1.mp3").await);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_reported_changed() {
        let storage = Arc::new(MemoryStorage::new());
        storage.add_file("/b/1.mp3", b"audio", 5);
        let service = service(storage.clone());
        service.compute_and_save("/b/1.mp3").await.unwrap();

        storage.fail_reads("/b/1.mp3");
        assert!(service.has_changed("/b/1.mp3").await);
        assert!(service.has_changed("/b/missing.mp3").await);
    }

    #[tokio::test]
    async fn test_repository_failure_reports_changed() {
        let storage = Arc::new(MemoryStorage::new());
        storage.add_file("/b/1.mp3", b"audio", 5);

        let mut repository = MockChecksumRepo::new();
        repository.expect_get().returning(|_| {
            Err(core_library::LibraryError::InvalidInput {
                field: "checksum".to_string(),
                message: "store offline".to_string(),
            })
        });
        repository.expect_save().times(0);

        let service = ChecksumService::new(
            storage,
            Arc::new(repository),
            Arc::new(ManualClock::new(1)),
        );
        assert!(service.has_changed("/b/1.mp3").await);
    }

    #[tokio::test]
    async fn test_cleanup_and_removal() {
        let storage = Arc::new(MemoryStorage::new());
        for name in ["1", "2", "3"] {
            storage.add_file(&format!("/b/{name}.mp3"), name.as_bytes(), 1);
        }
        let service = service(storage);
        for name in ["1", "2", "3"] {
            service
                .compute_and_save(&format!("/b/{name}.mp3"))
                .await
                .unwrap();
        }

        let current: HashSet<String> = ["/b/1.mp3".to_string()].into_iter().collect();
        assert_eq!(service.cleanup_missing_files(&current).await.unwrap(), 2);
        assert!(service.remove("/b/1.mp3").await.unwrap());
        assert_eq!(
            service
                .remove_many(&["/b/1.mp3".to_string(), "/b/2.mp3".to_string()])
                .await
                .unwrap(),
            0
        );
        service.clear().await.unwrap();
    }
}
