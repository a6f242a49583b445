//! Scan-state repository trait and implementation

use crate::error::Result;
use crate::models::FolderScanState;
use crate::repositories::{decode, decode_all, encode, SCAN_STATES_NAMESPACE};
use bridge_traits::persistence::KeyValueStore;
use std::sync::Arc;

/// Persistence for per-root scan summaries
#[async_trait::async_trait]
pub trait ScanStateRepository: Send + Sync {
    async fn get(&self, root_location: &str) -> Result<Option<FolderScanState>>;

    async fn save(&self, state: &FolderScanState) -> Result<()>;

    async fn delete(&self, root_location: &str) -> Result<bool>;

    /// Every stored state, ordered by root location
    async fn list(&self) -> Result<Vec<FolderScanState>>;

    /// Replace the whole cache atomically
    async fn replace_all(&self, states: &[FolderScanState]) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Key-value implementation of ScanStateRepository
pub struct KeyValueScanStateRepository {
    store: Arc<dyn KeyValueStore>,
}

impl KeyValueScanStateRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl ScanStateRepository for KeyValueScanStateRepository {
    async fn get(&self, root_location: &str) -> Result<Option<FolderScanState>> {
        match self.store.get(SCAN_STATES_NAMESPACE, root_location).await? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, state: &FolderScanState) -> Result<()> {
        let value = encode(state)?;
        self.store
            .put(SCAN_STATES_NAMESPACE, &state.root_location, &value)
            .await?;
        Ok(())
    }

    async fn delete(&self, root_location: &str) -> Result<bool> {
        Ok(self.store.delete(SCAN_STATES_NAMESPACE, root_location).await?)
    }

    async fn list(&self) -> Result<Vec<FolderScanState>> {
        let rows = self.store.enumerate(SCAN_STATES_NAMESPACE).await?;
        Ok(decode_all(SCAN_STATES_NAMESPACE, rows))
    }

    async fn replace_all(&self, states: &[FolderScanState]) -> Result<()> {
        let records = states
            .iter()
            .map(|state| Ok((state.root_location.clone(), encode(state)?)))
            .collect::<Result<Vec<_>>>()?;
        self.store.replace_all(SCAN_STATES_NAMESPACE, records).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.store.clear(SCAN_STATES_NAMESPACE).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::persistence::InMemoryKeyValueStore;

    fn state(root: &str, modified: i64) -> FolderScanState {
        FolderScanState {
            root_location: root.to_string(),
            last_scan_time: 1_000,
            last_modified_time: modified,
            file_count: 3,
            total_size: 300,
        }
    }

    #[tokio::test]
    async fn test_round_trip_through_store() {
        let repo = KeyValueScanStateRepository::new(Arc::new(InMemoryKeyValueStore::new()));

        repo.save(&state("/a", 5)).await.unwrap();
        repo.save(&state("/a", 6)).await.unwrap();

        let loaded = repo.get("/a").await.unwrap().unwrap();
        assert_eq!(loaded.last_modified_time, 6);
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_all_and_clear() {
        let repo = KeyValueScanStateRepository::new(Arc::new(InMemoryKeyValueStore::new()));
        repo.save(&state("/stale", 1)).await.unwrap();

        repo.replace_all(&[state("/a", 1), state("/b", 2)]).await.unwrap();
        let roots: Vec<_> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.root_location)
            .collect();
        assert_eq!(roots, vec!["/a", "/b"]);

        repo.clear().await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
        assert!(!repo.delete("/a").await.unwrap());
    }
}
