//! Items and the folder/resource forest.
//!
//! Items are read from an externally owned cache and never mutated here.
//! [`ItemTree`] indexes a flat item list by id and by parent so cascades can
//! resolve their scope without walking the list repeatedly.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{MoveCheckError, PreconditionError, ValidationError};
use crate::permission::AcoKind;
use crate::types::ItemId;

/// A folder or resource as seen by the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub kind: AcoKind,
    /// `None` when the item sits at the root.
    pub parent_id: Option<ItemId>,
    pub owned_by_current_user: bool,
    /// Exactly one OWNER permission, held by the current user.
    pub personal: bool,
}

impl Item {
    pub fn folder(id: ItemId, parent_id: Option<ItemId>) -> Self {
        Self {
            id,
            kind: AcoKind::Folder,
            parent_id,
            owned_by_current_user: true,
            personal: true,
        }
    }

    pub fn resource(id: ItemId, parent_id: Option<ItemId>) -> Self {
        Self {
            id,
            kind: AcoKind::Resource,
            parent_id,
            owned_by_current_user: true,
            personal: true,
        }
    }

    /// Mark as shared with others.
    pub fn shared(mut self) -> Self {
        self.personal = false;
        self
    }

    /// Mark as not owned by the current user. Such an item is shared by
    /// definition.
    pub fn not_owned(mut self) -> Self {
        self.owned_by_current_user = false;
        self.personal = false;
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind == AcoKind::Folder
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Index over a flat list of items.
///
/// Iteration orders follow the order items were supplied in, so scope
/// resolution is deterministic for a given provider response.
#[derive(Debug, Clone, Default)]
pub struct ItemTree {
    items: Vec<Item>,
    by_id: HashMap<ItemId, usize>,
    children: HashMap<ItemId, Vec<usize>>,
}

impl ItemTree {
    /// Build the index. Later duplicates of an id are ignored.
    pub fn new(items: Vec<Item>) -> Self {
        let mut tree = Self::default();
        for item in items {
            if tree.by_id.contains_key(&item.id) {
                continue;
            }
            let index = tree.items.len();
            tree.by_id.insert(item.id, index);
            tree.items.push(item);
        }
        for (index, item) in tree.items.iter().enumerate() {
            if let Some(parent) = item.parent_id {
                tree.children.entry(parent).or_default().push(index);
            }
        }
        tree
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.by_id.get(id).map(|&i| &self.items[i])
    }

    /// Like [`get`](Self::get) but unknown ids are a validation error.
    pub fn require(&self, id: &ItemId) -> Result<&Item, ValidationError> {
        self.get(id).ok_or(ValidationError::UnknownItem(*id))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Direct children of `id`.
    pub fn children(&self, id: &ItemId) -> impl Iterator<Item = &Item> {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .map(|&i| &self.items[i])
    }

    /// All descendants of `id` in pre-order. `id` itself is excluded.
    pub fn descendants(&self, id: &ItemId) -> Vec<&Item> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([*id]);
        let mut stack: Vec<&Item> = self.children(id).collect();
        stack.reverse();

        while let Some(item) = stack.pop() {
            // A corrupt cache may contain cycles.
            if !seen.insert(item.id) {
                continue;
            }
            out.push(item);
            let mut kids: Vec<&Item> = self.children(&item.id).collect();
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// Descendant folders of `id` owned by the current user.
    pub fn owned_descendant_folders(&self, id: &ItemId) -> Vec<&Item> {
        self.descendants(id)
            .into_iter()
            .filter(|item| item.is_folder() && item.owned_by_current_user)
            .collect()
    }

    /// Descendant resources of `id` owned by the current user, at any depth.
    pub fn owned_descendant_resources(&self, id: &ItemId) -> Vec<&Item> {
        self.descendants(id)
            .into_iter()
            .filter(|item| !item.is_folder() && item.owned_by_current_user)
            .collect()
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: &ItemId) -> Vec<&Item> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([*id]);
        let mut cursor = self.get(id).and_then(|item| item.parent_id);

        while let Some(parent_id) = cursor {
            if !seen.insert(parent_id) {
                break;
            }
            match self.get(&parent_id) {
                Some(parent) => {
                    out.push(parent);
                    cursor = parent.parent_id;
                }
                None => break,
            }
        }
        out
    }

    /// Whether `candidate` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, candidate: &ItemId, ancestor: &ItemId) -> bool {
        self.ancestors(candidate)
            .iter()
            .any(|item| &item.id == ancestor)
    }

    /// Whether the parent context of an item is personal or the root.
    ///
    /// Unknown parents count as root: the current user cannot see them, so
    /// nothing is inherited from them locally.
    pub fn is_personal_or_root(&self, parent: Option<&ItemId>) -> bool {
        match parent.and_then(|id| self.get(id)) {
            None => true,
            Some(folder) => folder.personal,
        }
    }

    /// Structural checks for moving `item` under `destination`.
    pub fn validate_move(
        &self,
        item: &ItemId,
        destination: Option<&ItemId>,
    ) -> Result<(), MoveCheckError> {
        self.require(item)?;

        let Some(destination) = destination else {
            return Ok(());
        };
        let target = self.require(destination)?;

        if destination == item {
            return Err(PreconditionError::MoveIntoSelf(*item).into());
        }
        if !target.is_folder() {
            return Err(PreconditionError::DestinationNotFolder(*destination).into());
        }
        if self.is_descendant_of(destination, item) {
            return Err(PreconditionError::MoveIntoDescendant {
                item: *item,
                destination: *destination,
            }
            .into());
        }
        Ok(())
    }
}
