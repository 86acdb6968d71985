//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use proptest::prelude::*;

use canopy_core::{AcoKind, ItemId, Permission, PermissionSet, PermissionType, Principal};

use crate::fixtures::{group, user};

/// Generate a permission level.
pub fn permission_type() -> impl Strategy<Value = PermissionType> {
    prop_oneof![
        Just(PermissionType::Read),
        Just(PermissionType::Update),
        Just(PermissionType::Owner),
    ]
}

/// Generate an item kind.
pub fn aco_kind() -> impl Strategy<Value = AcoKind> {
    prop_oneof![Just(AcoKind::Folder), Just(AcoKind::Resource)]
}

/// Generate a user or group drawn from a pool of `pool` ids of each kind.
pub fn principal(pool: u8) -> impl Strategy<Value = Principal> {
    let pool = pool.max(1);
    prop_oneof![
        3 => (1..=pool).prop_map(user),
        1 => (1..=pool).prop_map(group),
    ]
}

/// Generate up to `max` grants with distinct principals, in a stable order.
pub fn grants(pool: u8, max: usize) -> impl Strategy<Value = BTreeMap<Principal, PermissionType>> {
    prop::collection::btree_map(principal(pool), permission_type(), 0..=max)
}

fn to_set(aco: AcoKind, item: ItemId, grants: BTreeMap<Principal, PermissionType>) -> PermissionSet {
    let permissions = grants
        .into_iter()
        .map(|(principal, access)| Permission::new(aco, item, principal, access))
        .collect();
    PermissionSet::from_permissions(aco, item, permissions)
        .expect("map keys are distinct principals")
}

/// Generate a snapshot of `item` with up to `max` grants.
pub fn permission_set(
    aco: AcoKind,
    item: ItemId,
    pool: u8,
    max: usize,
) -> impl Strategy<Value = PermissionSet> {
    grants(pool, max).prop_map(move |grants| to_set(aco, item, grants))
}

/// Generate a snapshot in which `owner` always holds OWNER.
pub fn owned_permission_set(
    aco: AcoKind,
    item: ItemId,
    owner: Principal,
    pool: u8,
    max: usize,
) -> impl Strategy<Value = PermissionSet> {
    grants(pool, max).prop_map(move |mut grants| {
        grants.insert(owner, PermissionType::Owner);
        to_set(aco, item, grants)
    })
}

/// A pair of snapshots of the same item: before and after an edit.
pub fn snapshot_pair(
    aco: AcoKind,
    item: ItemId,
    pool: u8,
    max: usize,
) -> impl Strategy<Value = (PermissionSet, PermissionSet)> {
    (
        permission_set(aco, item, pool, max),
        permission_set(aco, item, pool, max),
    )
}
