//! Ordered collections of permission changes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use canopy_core::{AcoKind, ItemId, PermissionSet, Principal};

use crate::change::PermissionChange;
use crate::error::{PermsError, Result};

/// An ordered list of changes, possibly spanning several items.
///
/// Callers must not merge sets with overlapping (item, principal) keys and
/// expect automatic conflict resolution; order is preserved as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionChangeSet {
    changes: Vec<PermissionChange>,
}

impl PermissionChangeSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the minimal changes turning `original` into `expected`.
    ///
    /// Both snapshots must describe the same item. Matching is by principal:
    /// a principal whose level changes yields one update, never a delete and
    /// a create. Creates and updates come first in `expected` order, then
    /// deletes in `original` order.
    pub fn compute(original: &PermissionSet, expected: &PermissionSet) -> Result<Self> {
        if original.item() != expected.item() {
            return Err(PermsError::SnapshotMismatch {
                expected: original.item(),
                found: expected.item(),
            });
        }

        let mut changes = Vec::new();

        for wanted in expected.iter() {
            match original.get(&wanted.principal) {
                None => changes.push(PermissionChange::create(
                    original.aco(),
                    original.item(),
                    wanted.principal,
                    wanted.access,
                )),
                Some(current) if current.access != wanted.access => {
                    changes.push(PermissionChange::update(current, wanted.access));
                }
                Some(_) => {}
            }
        }

        for current in original.iter() {
            if !expected.contains(&current.principal) {
                changes.push(PermissionChange::delete(current));
            }
        }

        Ok(Self { changes })
    }

    /// Ordered union of two sets.
    pub fn merge(a: PermissionChangeSet, b: PermissionChangeSet) -> Self {
        let mut merged = a;
        merged.extend(b);
        merged
    }

    /// Append every change of `other`.
    pub fn extend(&mut self, other: PermissionChangeSet) {
        self.changes.extend(other.changes);
    }

    pub fn push(&mut self, change: PermissionChange) {
        self.changes.push(change);
    }

    /// Copy the whole set onto another item.
    pub fn retarget(&self, aco: AcoKind, item: ItemId) -> Self {
        Self {
            changes: self.changes.iter().map(|c| c.retarget(aco, item)).collect(),
        }
    }

    /// Changes addressed to `item`.
    pub fn for_item(&self, item: &ItemId) -> Self {
        self.filter(|c| &c.aco_foreign_key == item)
    }

    /// Changes addressed to `principal`, on any item.
    pub fn for_principal(&self, principal: &Principal) -> Self {
        self.filter(|c| &c.principal == principal)
    }

    pub fn creates(&self) -> Self {
        self.filter(PermissionChange::is_create)
    }

    pub fn deletes(&self) -> Self {
        self.filter(PermissionChange::is_delete)
    }

    fn filter(&self, keep: impl Fn(&PermissionChange) -> bool) -> Self {
        Self {
            changes: self.changes.iter().filter(|c| keep(c)).cloned().collect(),
        }
    }

    /// Distinct items addressed, in first-seen order.
    pub fn item_ids(&self) -> Vec<ItemId> {
        let mut seen = HashSet::new();
        self.changes
            .iter()
            .map(|c| c.aco_foreign_key)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Split into one set per item, in first-seen order.
    pub fn group_by_item(&self) -> Vec<(ItemId, PermissionChangeSet)> {
        self.item_ids()
            .into_iter()
            .map(|id| (id, self.for_item(&id)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionChange> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn as_slice(&self) -> &[PermissionChange] {
        &self.changes
    }
}

impl From<Vec<PermissionChange>> for PermissionChangeSet {
    fn from(changes: Vec<PermissionChange>) -> Self {
        Self { changes }
    }
}

impl FromIterator<PermissionChange> for PermissionChangeSet {
    fn from_iter<I: IntoIterator<Item = PermissionChange>>(iter: I) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PermissionChangeSet {
    type Item = PermissionChange;
    type IntoIter = std::vec::IntoIter<PermissionChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a> IntoIterator for &'a PermissionChangeSet {
    type Item = &'a PermissionChange;
    type IntoIter = std::slice::Iter<'a, PermissionChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeScenario;
    use canopy_core::{Permission, PermissionId, PermissionType, PrincipalId};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn item(n: u8) -> ItemId {
        ItemId::from_bytes([n; 16])
    }

    fn user(n: u8) -> Principal {
        Principal::user(PrincipalId::from_bytes([n; 16]))
    }

    fn stored(item_id: ItemId, who: Principal, access: PermissionType, row: u8) -> Permission {
        Permission::new(AcoKind::Folder, item_id, who, access)
            .with_id(PermissionId::from_bytes([row; 16]))
    }

    #[test]
    fn test_compute_update_then_create() {
        let folder = item(1);
        let (a, b) = (user(0xa), user(0xb));
        let original = PermissionSet::from_permissions(
            AcoKind::Folder,
            folder,
            vec![stored(folder, a, PermissionType::Read, 1)],
        )
        .unwrap();
        let expected = PermissionSet::new(AcoKind::Folder, folder)
            .grant(a, PermissionType::Update)
            .unwrap()
            .grant(b, PermissionType::Read)
            .unwrap();

        let changes = PermissionChangeSet::compute(&original, &expected).unwrap();
        let got: Vec<_> = changes.iter().collect();

        assert_eq!(got.len(), 2);
        assert_eq!(got[0].principal, a);
        assert_eq!(got[0].access, PermissionType::Update);
        assert_eq!(
            got[0].scenario,
            ChangeScenario::Update {
                from_id: Some(PermissionId::from_bytes([1; 16]))
            }
        );
        assert_eq!(got[1].principal, b);
        assert_eq!(got[1].access, PermissionType::Read);
        assert_eq!(got[1].scenario, ChangeScenario::Create);
    }

    #[test]
    fn test_compute_deletes_last_in_original_order() {
        let folder = item(1);
        let original = PermissionSet::from_permissions(
            AcoKind::Folder,
            folder,
            vec![
                stored(folder, user(1), PermissionType::Owner, 1),
                stored(folder, user(2), PermissionType::Read, 2),
                stored(folder, user(3), PermissionType::Read, 3),
            ],
        )
        .unwrap();
        let expected = PermissionSet::new(AcoKind::Folder, folder)
            .grant(user(4), PermissionType::Read)
            .unwrap()
            .grant(user(1), PermissionType::Owner)
            .unwrap();

        let changes = PermissionChangeSet::compute(&original, &expected).unwrap();
        let principals: Vec<Principal> = changes.iter().map(|c| c.principal).collect();

        assert_eq!(principals, vec![user(4), user(2), user(3)]);
        assert!(changes.as_slice()[1].is_delete());
        assert_eq!(changes.deletes().len(), 2);
    }

    #[test]
    fn test_compute_rejects_different_items() {
        let a = PermissionSet::new(AcoKind::Folder, item(1));
        let b = PermissionSet::new(AcoKind::Folder, item(2));
        assert_eq!(
            PermissionChangeSet::compute(&a, &b),
            Err(PermsError::SnapshotMismatch {
                expected: item(1),
                found: item(2)
            })
        );
    }

    #[test]
    fn test_group_by_item_preserves_order() {
        let mut set = PermissionChangeSet::new();
        for n in [2u8, 1, 2, 3] {
            set.push(PermissionChange::create(
                AcoKind::Folder,
                item(n),
                user(n),
                PermissionType::Read,
            ));
        }

        let groups = set.group_by_item();
        let ids: Vec<ItemId> = groups.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![item(2), item(1), item(3)]);
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn test_merge_and_principal_filters() {
        let a: PermissionChangeSet = vec![PermissionChange::create(
            AcoKind::Folder,
            item(1),
            user(1),
            PermissionType::Read,
        )]
        .into();
        let b: PermissionChangeSet = vec![PermissionChange::create(
            AcoKind::Folder,
            item(1),
            user(2),
            PermissionType::Read,
        )]
        .into();

        let merged = PermissionChangeSet::merge(a, b);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.for_principal(&user(2)).len(), 1);
        assert_eq!(merged.as_slice()[0].principal, user(1));
    }

    #[test]
    fn test_retarget_whole_set() {
        let set: PermissionChangeSet = vec![PermissionChange::create(
            AcoKind::Folder,
            item(1),
            user(1),
            PermissionType::Read,
        )]
        .into();

        let moved = set.retarget(AcoKind::Resource, item(7));
        assert_eq!(moved.item_ids(), vec![item(7)]);
        assert_eq!(moved.as_slice()[0].aco, AcoKind::Resource);
        assert!(set.for_item(&item(7)).is_empty());
    }

    fn level(n: u8) -> PermissionType {
        [PermissionType::Read, PermissionType::Update, PermissionType::Owner][n as usize % 3]
    }

    fn snapshot(folder: ItemId, grants: &BTreeMap<u8, u8>) -> PermissionSet {
        grants
            .iter()
            .fold(PermissionSet::new(AcoKind::Folder, folder), |set, (&who, &access)| {
                set.grant(user(who), level(access)).unwrap()
            })
    }

    proptest! {
        #[test]
        fn prop_compute_orders_deletes_last(
            before in proptest::collection::btree_map(0u8..10, 0u8..3, 0..8),
            after in proptest::collection::btree_map(0u8..10, 0u8..3, 0..8),
        ) {
            let original = snapshot(item(1), &before);
            let expected = snapshot(item(1), &after);
            let changes = PermissionChangeSet::compute(&original, &expected).unwrap();

            let first_delete = changes.iter().position(|c| c.is_delete()).unwrap_or(changes.len());
            prop_assert!(changes.iter().skip(first_delete).all(|c| c.is_delete()));

            let touched: HashSet<Principal> = changes.iter().map(|c| c.principal).collect();
            prop_assert_eq!(touched.len(), changes.len());
            for change in changes.iter() {
                prop_assert!(!change.is_create() || !original.contains(&change.principal));
            }
        }

        #[test]
        fn prop_retarget_keeps_everything_but_the_item(
            after in proptest::collection::btree_map(0u8..10, 0u8..3, 0..8),
            target in any::<u8>(),
        ) {
            let original = PermissionSet::new(AcoKind::Folder, item(1));
            let changes =
                PermissionChangeSet::compute(&original, &snapshot(item(1), &after)).unwrap();
            let moved = changes.retarget(AcoKind::Resource, item(target));

            prop_assert_eq!(moved.len(), changes.len());
            prop_assert!(moved.iter().all(|c| c.aco_foreign_key == item(target)));
            prop_assert!(moved.iter().all(|c| c.aco == AcoKind::Resource));
            for (a, b) in moved.iter().zip(changes.iter()) {
                prop_assert_eq!(a.principal, b.principal);
                prop_assert_eq!(a.access, b.access);
                prop_assert_eq!(&a.scenario, &b.scenario);
            }
        }
    }
}
