//! Checksum repository trait and implementation

use crate::error::Result;
use crate::models::FileChecksumRecord;
use crate::repositories::{decode, decode_all, encode, CHECKSUMS_NAMESPACE};
use bridge_traits::persistence::KeyValueStore;
use std::sync::Arc;

/// Persistence for per-file digests
#[async_trait::async_trait]
pub trait ChecksumRepository: Send + Sync {
    async fn get(&self, location: &str) -> Result<Option<FileChecksumRecord>>;

    async fn save(&self, record: &FileChecksumRecord) -> Result<()>;

    /// Returns `Ok(true)` when a record was removed
    async fn delete(&self, location: &str) -> Result<bool>;

    async fn list(&self) -> Result<Vec<FileChecksumRecord>>;

    async fn replace_all(&self, records: &[FileChecksumRecord]) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Key-value implementation of ChecksumRepository
pub struct KeyValueChecksumRepository {
    store: Arc<dyn KeyValueStore>,
}

impl KeyValueChecksumRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl ChecksumRepository for KeyValueChecksumRepository {
    async fn get(&self, location: &str) -> Result<Option<FileChecksumRecord>> {
        match self.store.get(CHECKSUMS_NAMESPACE, location).await? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: &FileChecksumRecord) -> Result<()> {
        let value = encode(record)?;
        self.store
            .put(CHECKSUMS_NAMESPACE, &record.location, &value)
            .await?;
        Ok(())
    }

    async fn delete(&self, location: &str) -> Result<bool> {
        Ok(self.store.delete(CHECKSUMS_NAMESPACE, location).await?)
    }

    async fn list(&self) -> Result<Vec<FileChecksumRecord>> {
        let rows = self.store.enumerate(CHECKSUMS_NAMESPACE).await?;
        Ok(decode_all(CHECKSUMS_NAMESPACE, rows))
    }

    async fn replace_all(&self, records: &[FileChecksumRecord]) -> Result<()> {
        let rows = records
            .iter()
            .map(|record| Ok((record.location.clone(), encode(record)?)))
            .collect::<Result<Vec<_>>>()?;
        self.store.replace_all(CHECKSUMS_NAMESPACE, rows).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.store.clear(CHECKSUMS_NAMESPACE).await?;
        Ok(())
    }
}
