//! Group repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::Group;
use crate::ordering::compare_paths;
use crate::repositories::{decode, decode_all, encode, GROUPS_NAMESPACE};
use bridge_traits::persistence::KeyValueStore;
use std::sync::Arc;

/// Group repository interface for data access operations
#[async_trait::async_trait]
pub trait GroupRepository: Send + Sync {
    /// Find a group by its location
    async fn get(&self, location: &str) -> Result<Option<Group>>;

    /// Insert or overwrite a group
    ///
    /// # Errors
    /// Returns error if validation fails or the store rejects the write
    async fn save(&self, group: &Group) -> Result<()>;

    /// Insert or overwrite several groups
    async fn save_all(&self, groups: &[Group]) -> Result<()>;

    /// Delete a group by location
    ///
    /// # Returns
    /// - `Ok(true)` if the group was deleted
    /// - `Ok(false)` if it was not stored
    async fn delete(&self, location: &str) -> Result<bool>;

    /// Every stored group in natural location order
    async fn list(&self) -> Result<Vec<Group>>;

    /// Replace the whole collection atomically
    async fn replace_all(&self, groups: &[Group]) -> Result<()>;
}

/// Key-value implementation of GroupRepository
pub struct KeyValueGroupRepository {
    store: Arc<dyn KeyValueStore>,
}

impl KeyValueGroupRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn validate_group(group: &Group) -> Result<()> {
        group.validate().map_err(|msg| LibraryError::InvalidInput {
            field: "Group".to_string(),
            message: msg,
        })
    }
}

#[async_trait::async_trait]
impl GroupRepository for KeyValueGroupRepository {
    async fn get(&self, location: &str) -> Result<Option<Group>> {
        match self.store.get(GROUPS_NAMESPACE, location).await? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, group: &Group) -> Result<()> {
        Self::validate_group(group)?;
        let value = encode(group)?;
        self.store.put(GROUPS_NAMESPACE, &group.location, &value).await?;
        Ok(())
    }

    async fn save_all(&self, groups: &[Group]) -> Result<()> {
        for group in groups {
            self.save(group).await?;
        }
        Ok(())
    }

    async fn delete(&self, location: &str) -> Result<bool> {
        Ok(self.store.delete(GROUPS_NAMESPACE, location).await?)
    }

    async fn list(&self) -> Result<Vec<Group>> {
        let rows = self.store.enumerate(GROUPS_NAMESPACE).await?;
        let mut groups: Vec<Group> = decode_all(GROUPS_NAMESPACE, rows);
        groups.sort_by(|a, b| compare_paths(&a.location, &b.location));
        Ok(groups)
    }

    async fn replace_all(&self, groups: &[Group]) -> Result<()> {
        let mut records = Vec::with_capacity(groups.len());
        for group in groups {
            Self::validate_group(group)?;
            records.push((group.location.clone(), encode(group)?));
        }
        self.store.replace_all(GROUPS_NAMESPACE, records).await?;
        Ok(())
    }
}
