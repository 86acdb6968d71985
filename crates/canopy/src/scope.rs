//! Which items a cascade touches, and their snapshots.

use std::collections::{HashMap, HashSet};

use canopy_core::{Item, ItemId, ItemTree, PermissionSet};
use canopy_store::{ItemTreeProvider, StoreError};

use crate::error::Result;

/// Items affected by a cascade rooted at one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    /// Affected folders, root first when included, then pre-order.
    pub folders: Vec<ItemId>,
    /// Affected resources, in pre-order.
    pub resources: Vec<ItemId>,
}

impl Scope {
    /// Resolve the scope rooted at `root`.
    ///
    /// Folders are the root (when `include_root`) and every descendant folder
    /// owned by the current user. Resources are every descendant resource
    /// owned by the current user, whoever owns the folders in between. A
    /// resource root is its own scope.
    pub fn resolve(tree: &ItemTree, root: &Item, include_root: bool) -> Self {
        if !root.is_folder() {
            return Self {
                folders: Vec::new(),
                resources: if include_root { vec![root.id] } else { Vec::new() },
            };
        }

        let descendants: Vec<ItemId> = tree
            .owned_descendant_folders(&root.id)
            .into_iter()
            .map(|item| item.id)
            .collect();

        let resources = tree
            .owned_descendant_resources(&root.id)
            .into_iter()
            .map(|item| item.id)
            .collect();

        let folders = if include_root {
            std::iter::once(root.id).chain(descendants).collect()
        } else {
            descendants
        };
        Self { folders, resources }
    }

    /// Folder ids then resource ids.
    pub fn ids(&self) -> Vec<ItemId> {
        self.folders
            .iter()
            .chain(self.resources.iter())
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.folders.len() + self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Permission snapshots fetched in one provider call.
pub(crate) struct Snapshots {
    sets: HashMap<ItemId, PermissionSet>,
}

impl Snapshots {
    /// Fetch snapshots for `ids`, each requested once.
    pub(crate) async fn fetch<P: ItemTreeProvider>(provider: &P, ids: &[ItemId]) -> Result<Self> {
        let mut seen = HashSet::new();
        let unique: Vec<ItemId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let sets = if unique.is_empty() {
            HashMap::new()
        } else {
            provider.get_permissions(&unique).await?
        };
        Ok(Self { sets })
    }

    /// The snapshot for `id`, which the provider must have returned.
    pub(crate) fn require(&self, id: &ItemId) -> Result<&PermissionSet> {
        Ok(self
            .sets
            .get(id)
            .ok_or(StoreError::MissingPermissions(*id))?)
    }

    /// The snapshot for a parent context. The root, and parents the provider
    /// does not return, grant nothing.
    pub(crate) fn parent(&self, id: Option<&ItemId>) -> Option<&PermissionSet> {
        id.and_then(|id| self.sets.get(id))
    }
}
