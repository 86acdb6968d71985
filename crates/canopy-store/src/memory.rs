//! In-memory implementation of the collaborator traits.
//!
//! This is primarily for testing. Writes go through the same strict
//! [`apply`] the cascades are checked against, so a change whose
//! precondition fails is rejected exactly as a real server would reject it.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use canopy_core::{Item, ItemId, PermissionId, PermissionSet, Principal};
use canopy_perms::{apply, PermissionChangeSet};

use crate::error::{Result, StoreError};
use crate::traits::{ItemTreeProvider, PermissionWriteApi, WorkingKey};

/// One recorded call, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    GetAll,
    GetPermissions(Vec<ItemId>),
    WriteFolder { folder: ItemId, changes: usize },
    WriteResources { resources: Vec<ItemId>, changes: usize },
    Move { item: ItemId, parent: Option<ItemId> },
    Refresh,
}

/// In-memory provider and writer.
///
/// Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryBackend {
    inner: RwLock<MemoryBackendInner>,
}

#[derive(Default)]
struct MemoryBackendInner {
    /// Items in insertion order.
    items: Vec<Item>,

    /// Permission snapshot per item.
    permissions: HashMap<ItemId, PermissionSet>,

    /// Every call received.
    calls: Vec<BackendCall>,

    /// Items whose writes and moves fail.
    failing: HashSet<ItemId>,

    /// Secrets re-encrypted for newly granted principals.
    shared_secrets: Vec<(ItemId, Principal)>,

    /// Fail every call when set.
    offline: bool,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryBackendInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryBackendInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add an item with its permissions. Replaces any previous entry.
    pub fn insert(&self, item: Item, permissions: PermissionSet) {
        let mut inner = self.write();
        let permissions = with_row_ids(permissions);
        inner.items.retain(|existing| existing.id != item.id);
        inner.permissions.insert(item.id, permissions);
        inner.items.push(item);
    }

    /// Current item record.
    pub fn item(&self, id: &ItemId) -> Option<Item> {
        self.read().items.iter().find(|i| &i.id == id).cloned()
    }

    /// Current permission snapshot.
    pub fn permissions_of(&self, id: &ItemId) -> Option<PermissionSet> {
        self.read().permissions.get(id).cloned()
    }

    /// Overwrite an item's permissions behind the cascades' back, simulating
    /// a concurrent edit by another user.
    pub fn set_permissions(&self, permissions: PermissionSet) {
        let mut inner = self.write();
        let permissions = with_row_ids(permissions);
        inner.permissions.insert(permissions.item(), permissions);
    }

    /// Make writes and moves touching `id` fail.
    pub fn fail_writes_for(&self, id: ItemId) {
        self.write().failing.insert(id);
    }

    /// Undo [`fail_writes_for`](Self::fail_writes_for).
    pub fn clear_failures(&self) {
        self.write().failing.clear();
    }

    /// Fail every call, reads included.
    pub fn set_offline(&self, offline: bool) {
        self.write().offline = offline;
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.read().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.write().calls.clear();
    }

    /// Number of snapshot reads.
    pub fn permission_fetches(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::GetPermissions(_)))
    }

    /// Number of folder and resource writes.
    pub fn permission_writes(&self) -> usize {
        self.count(|c| {
            matches!(
                c,
                BackendCall::WriteFolder { .. } | BackendCall::WriteResources { .. }
            )
        })
    }

    pub fn refreshes(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::Refresh))
    }

    /// (resource, principal) pairs whose secret was re-encrypted.
    pub fn shared_secrets(&self) -> Vec<(ItemId, Principal)> {
        self.read().shared_secrets.clone()
    }

    fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.read().calls.iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: BackendCall) -> Result<()> {
        let mut inner = self.write();
        inner.calls.push(call);
        if inner.offline {
            return Err(StoreError::Unavailable("backend offline".into()));
        }
        Ok(())
    }
}

impl MemoryBackendInner {
    fn apply_to(&mut self, id: &ItemId, changes: &PermissionChangeSet) -> Result<()> {
        if self.failing.contains(id) {
            return Err(StoreError::WriteRejected {
                item: *id,
                reason: "injected failure".into(),
            });
        }
        let current = self
            .permissions
            .get(id)
            .ok_or(StoreError::UnknownItem(*id))?;

        let next = with_row_ids(apply(current, &changes.for_item(id))?);
        let personal = next.is_personal();
        self.permissions.insert(*id, next);

        if let Some(item) = self.items.iter_mut().find(|i| &i.id == id) {
            item.personal = personal;
        }
        Ok(())
    }
}

/// Give every unsaved permission a fresh row id.
fn with_row_ids(mut set: PermissionSet) -> PermissionSet {
    set.assign_ids(PermissionId::random);
    set
}

#[async_trait]
impl ItemTreeProvider for MemoryBackend {
    async fn get_all(&self) -> Result<Vec<Item>> {
        self.record(BackendCall::GetAll)?;
        Ok(self.read().items.clone())
    }

    async fn get_permissions(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, PermissionSet>> {
        self.record(BackendCall::GetPermissions(ids.to_vec()))?;
        let inner = self.read();
        Ok(ids
            .iter()
            .filter_map(|id| inner.permissions.get(id).map(|set| (*id, set.clone())))
            .collect())
    }

    async fn move_item(&self, id: &ItemId, new_parent: Option<ItemId>) -> Result<()> {
        self.record(BackendCall::Move {
            item: *id,
            parent: new_parent,
        })?;
        let mut inner = self.write();
        if inner.failing.contains(id) {
            return Err(StoreError::MoveRejected {
                item: *id,
                reason: "injected failure".into(),
            });
        }
        let item = inner
            .items
            .iter_mut()
            .find(|i| &i.id == id)
            .ok_or(StoreError::UnknownItem(*id))?;
        item.parent_id = new_parent;
        Ok(())
    }

    async fn refresh_cache(&self) -> Result<()> {
        self.record(BackendCall::Refresh)
    }
}

#[async_trait]
impl PermissionWriteApi for MemoryBackend {
    async fn write_folder_permissions(
        &self,
        folder_id: &ItemId,
        changes: &PermissionChangeSet,
    ) -> Result<()> {
        self.record(BackendCall::WriteFolder {
            folder: *folder_id,
            changes: changes.for_item(folder_id).len(),
        })?;
        self.write().apply_to(folder_id, changes)
    }

    async fn write_resource_permissions(
        &self,
        resource_ids: &[ItemId],
        changes: &PermissionChangeSet,
        key: &WorkingKey,
    ) -> Result<()> {
        self.record(BackendCall::WriteResources {
            resources: resource_ids.to_vec(),
            changes: changes.len(),
        })?;
        if key.is_empty() {
            return Err(StoreError::KeyRequired);
        }

        let mut inner = self.write();
        // Resources are written one by one; a failure leaves earlier ones done.
        for id in resource_ids {
            inner.apply_to(id, changes)?;
            let granted: Vec<(ItemId, Principal)> = changes
                .for_item(id)
                .creates()
                .iter()
                .map(|c| (*id, c.principal))
                .collect();
            inner.shared_secrets.extend(granted);
        }
        Ok(())
    }
}
