//! Key-Value Persistence Abstractions
//!
//! The scanner saves groups, scan states and checksums through a generic
//! namespaced key-value store. Records are serialized by the repositories;
//! the store only sees strings.
//!
//! # Example
//!
//! ```ignore
//! use bridge_traits::persistence::KeyValueStore;
//!
//! async fn remember(store: &dyn KeyValueStore) -> Result<()> {
//!     store.put("scan_states", "/books", "{...}").await?;
//!     let all = store.enumerate("scan_states").await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::error::Result;

/// Namespaced string key-value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a record
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite a record
    async fn put(&self, namespace: &str, key: &str, value: &str) -> Result<()>;

    /// Delete a record
    ///
    /// Returns `Ok(true)` when something was removed.
    async fn delete(&self, namespace: &str, key: &str) -> Result<bool>;

    /// All records of a namespace, ordered by key
    async fn enumerate(&self, namespace: &str) -> Result<Vec<(String, String)>>;

    /// Atomically replace every record of a namespace
    ///
    /// Either all of `records` become visible or none of them do.
    async fn replace_all(&self, namespace: &str, records: Vec<(String, String)>) -> Result<()>;

    /// Remove every record of a namespace
    async fn clear(&self, namespace: &str) -> Result<()> {
        self.replace_all(namespace, Vec::new()).await
    }
}

/// In-process store backed by a map
///
/// Suitable for hosts without durable storage and for tests.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    namespaces: RwLock<HashMap<String, BTreeMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a namespace
    pub async fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .map(|records| records.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .and_then(|records| records.get(key).cloned()))
    }

    async fn put(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
        Ok(self
            .namespaces
            .write()
            .await
            .get_mut(namespace)
            .map(|records| records.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn enumerate(&self, namespace: &str) -> Result<Vec<(String, String)>> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .map(|records| {
                records
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn replace_all(&self, namespace: &str, records: Vec<(String, String)>) -> Result<()> {
        let replacement: BTreeMap<String, String> = records.into_iter().collect();
        self.namespaces
            .write()
            .await
            .insert(namespace.to_string(), replacement);
        Ok(())
    }
}
