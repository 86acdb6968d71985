//! Planned permission writes and their execution.

use canopy_core::ItemId;
use canopy_perms::PermissionChangeSet;
use canopy_runner::TaskRunner;
use canopy_store::{PermissionWriteApi, WorkingKey};

use crate::error::Result;

/// Per-item change sets a cascade intends to write. Items with nothing to
/// change are left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannedWrites {
    pub folders: Vec<(ItemId, PermissionChangeSet)>,
    pub resources: Vec<(ItemId, PermissionChangeSet)>,
}

impl PlannedWrites {
    pub(crate) fn push_folder(&mut self, id: ItemId, changes: PermissionChangeSet) {
        if !changes.is_empty() {
            self.folders.push((id, changes));
        }
    }

    pub(crate) fn push_resource(&mut self, id: ItemId, changes: PermissionChangeSet) {
        if !changes.is_empty() {
            self.resources.push((id, changes));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.resources.is_empty()
    }

    /// Total number of changes across all items.
    pub fn change_count(&self) -> usize {
        self.folders
            .iter()
            .chain(self.resources.iter())
            .map(|(_, changes)| changes.len())
            .sum()
    }

    pub fn folder_ids(&self) -> Vec<ItemId> {
        self.folders.iter().map(|(id, _)| *id).collect()
    }

    pub fn resource_ids(&self) -> Vec<ItemId> {
        self.resources.iter().map(|(id, _)| *id).collect()
    }

    /// The changes planned for one item.
    pub fn for_item(&self, id: &ItemId) -> Option<&PermissionChangeSet> {
        self.folders
            .iter()
            .chain(self.resources.iter())
            .find(|(item, _)| item == id)
            .map(|(_, changes)| changes)
    }

    /// Every planned change, folders first.
    pub fn all_changes(&self) -> PermissionChangeSet {
        self.folders
            .iter()
            .chain(self.resources.iter())
            .flat_map(|(_, changes)| changes.iter().cloned())
            .collect()
    }

    fn resource_changes(&self) -> PermissionChangeSet {
        self.resources
            .iter()
            .flat_map(|(_, changes)| changes.iter().cloned())
            .collect()
    }
}

/// Write every folder's changes, one call per folder, at most `concurrency`
/// in flight. Stops claiming folders at the first failure.
pub(crate) async fn write_folders<W: PermissionWriteApi>(
    writer: &W,
    planned: &PlannedWrites,
    concurrency: usize,
) -> Result<()> {
    if planned.folders.is_empty() {
        return Ok(());
    }

    let tasks: Vec<_> = planned
        .folders
        .iter()
        .map(|(id, changes)| move || writer.write_folder_permissions(id, changes))
        .collect();

    let runner = TaskRunner::new(tasks, concurrency)?;
    if let Err(err) = runner.run().await {
        tracing::warn!(error = %err, folders = planned.folders.len(), "folder write phase aborted");
        return Err(err.into());
    }
    Ok(())
}

/// Write every resource's changes in one bulk call.
pub(crate) async fn write_resources<W: PermissionWriteApi>(
    writer: &W,
    planned: &PlannedWrites,
    key: &WorkingKey,
) -> Result<()> {
    if planned.resources.is_empty() {
        return Ok(());
    }

    let ids = planned.resource_ids();
    let changes = planned.resource_changes();
    if let Err(err) = writer.write_resource_permissions(&ids, &changes, key).await {
        tracing::warn!(error = %err, resources = ids.len(), "resource write phase aborted");
        return Err(err.into());
    }
    Ok(())
}
