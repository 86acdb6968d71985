//! Collaborator traits: the abstract interface to the remote side.
//!
//! Cascades are generic over these traits so they can run against the real
//! API client, the [`TreeCache`](crate::TreeCache) decorator, or the
//! in-memory backend used in tests.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use canopy_core::{Item, ItemId, PermissionSet};
use canopy_perms::PermissionChangeSet;

use crate::error::Result;

/// Decrypted key material used to re-encrypt secrets for newly granted
/// principals. Opaque to this crate; never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct WorkingKey(Vec<u8>);

impl WorkingKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for WorkingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkingKey([REDACTED; {}])", self.0.len())
    }
}

/// Item forest and permission snapshots for the current account.
#[async_trait]
pub trait ItemTreeProvider: Send + Sync {
    /// Every folder and resource visible to the current user.
    async fn get_all(&self) -> Result<Vec<Item>>;

    /// Current permission snapshots, keyed by item id.
    ///
    /// Implementations return an entry for every requested id they know.
    async fn get_permissions(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, PermissionSet>>;

    /// Re-parent an item. `None` moves it to the root.
    async fn move_item(&self, id: &ItemId, new_parent: Option<ItemId>) -> Result<()>;

    /// Ask the cache owner to re-read the item forest.
    async fn refresh_cache(&self) -> Result<()>;
}

/// Remote permission writes.
#[async_trait]
pub trait PermissionWriteApi: Send + Sync {
    /// Apply the changes addressed to one folder.
    async fn write_folder_permissions(
        &self,
        folder_id: &ItemId,
        changes: &PermissionChangeSet,
    ) -> Result<()>;

    /// Apply the changes addressed to the given resources, re-encrypting
    /// each secret for every newly granted principal.
    async fn write_resource_permissions(
        &self,
        resource_ids: &[ItemId],
        changes: &PermissionChangeSet,
        key: &WorkingKey,
    ) -> Result<()>;
}

#[async_trait]
impl<T: ItemTreeProvider + ?Sized> ItemTreeProvider for std::sync::Arc<T> {
    async fn get_all(&self) -> Result<Vec<Item>> {
        (**self).get_all().await
    }

    async fn get_permissions(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, PermissionSet>> {
        (**self).get_permissions(ids).await
    }

    async fn move_item(&self, id: &ItemId, new_parent: Option<ItemId>) -> Result<()> {
        (**self).move_item(id, new_parent).await
    }

    async fn refresh_cache(&self) -> Result<()> {
        (**self).refresh_cache().await
    }
}

#[async_trait]
impl<T: PermissionWriteApi + ?Sized> PermissionWriteApi for std::sync::Arc<T> {
    async fn write_folder_permissions(
        &self,
        folder_id: &ItemId,
        changes: &PermissionChangeSet,
    ) -> Result<()> {
        (**self).write_folder_permissions(folder_id, changes).await
    }

    async fn write_resource_permissions(
        &self,
        resource_ids: &[ItemId],
        changes: &PermissionChangeSet,
        key: &WorkingKey,
    ) -> Result<()> {
        (**self)
            .write_resource_permissions(resource_ids, changes, key)
            .await
    }
}
