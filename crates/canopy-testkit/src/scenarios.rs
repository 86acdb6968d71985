//! Worked scenarios with known outcomes.
//!
//! Each scenario carries its inputs and the exact change set an
//! implementation must produce, so the same cases can be checked against
//! the pure algorithms and against a cascade running on a memory backend.

use canopy_core::{AcoKind, ItemId, PermissionSet, PermissionType, Principal, ValidationError};
use canopy_perms::{PermissionChange, PermissionChangeSet};

use crate::fixtures::{item_id, permission_set, user};

pub const ALICE: u8 = 1;
pub const BOB: u8 = 2;
pub const CAROL: u8 = 3;

/// A diff between two snapshots of one item.
#[derive(Debug, Clone)]
pub struct ComputeScenario {
    pub name: &'static str,
    pub original: PermissionSet,
    pub expected: PermissionSet,
    pub changes: PermissionChangeSet,
}

/// A template replayed onto another item.
#[derive(Debug, Clone)]
pub struct ReplayScenario {
    pub name: &'static str,
    pub aco: AcoKind,
    pub item: ItemId,
    pub current: PermissionSet,
    pub template: PermissionChangeSet,
    pub reference: PermissionSet,
    pub changes: PermissionChangeSet,
}

/// A folder re-parented between two folders.
#[derive(Debug, Clone)]
pub struct MoveScenario {
    pub name: &'static str,
    pub item: PermissionSet,
    pub old_parent: PermissionSet,
    pub new_parent: PermissionSet,
    pub changes: PermissionChangeSet,
}

fn grants(n: &[(u8, PermissionType)]) -> Vec<(Principal, PermissionType)> {
    n.iter().map(|&(who, access)| (user(who), access)).collect()
}

/// {A:READ} to {A:UPDATE, B:READ} is one update and one create.
pub fn access_upgrade() -> Result<ComputeScenario, ValidationError> {
    use PermissionType::*;
    let item = item_id(10);
    let original = permission_set(AcoKind::Folder, item, &grants(&[(ALICE, Read)]))?;
    let expected = permission_set(
        AcoKind::Folder,
        item,
        &grants(&[(ALICE, Update), (BOB, Read)]),
    )?;

    let alice = original.get(&user(ALICE)).cloned();
    let changes = alice
        .iter()
        .map(|p| PermissionChange::update(p, Update))
        .chain(std::iter::once(PermissionChange::create(
            AcoKind::Folder,
            item,
            user(BOB),
            Read,
        )))
        .collect();

    Ok(ComputeScenario {
        name: "access upgrade plus new grant",
        original,
        expected,
        changes,
    })
}

/// A create for Carol on folder X replayed onto folder Y, where Carol already
/// holds UPDATE, yields nothing.
pub fn create_over_existing_grant() -> Result<ReplayScenario, ValidationError> {
    use PermissionType::*;
    let x = item_id(20);
    let y = item_id(21);

    let reference = permission_set(AcoKind::Folder, x, &grants(&[(ALICE, Owner)]))?;
    let current = permission_set(
        AcoKind::Folder,
        y,
        &grants(&[(ALICE, Owner), (CAROL, Update)]),
    )?;
    let template =
        vec![PermissionChange::create(AcoKind::Folder, x, user(CAROL), Read)].into();

    Ok(ReplayScenario {
        name: "create never overwrites an existing grant",
        aco: AcoKind::Folder,
        item: y,
        current,
        template,
        reference,
        changes: PermissionChangeSet::new(),
    })
}

/// Moving shared folder F from P to D adds Carol and leaves Bob's direct
/// grant alone.
pub fn move_into_wider_folder() -> Result<MoveScenario, ValidationError> {
    use PermissionType::*;
    let f = item_id(30);

    let item = permission_set(AcoKind::Folder, f, &grants(&[(ALICE, Owner), (BOB, Read)]))?;
    let old_parent = permission_set(AcoKind::Folder, item_id(31), &grants(&[(ALICE, Owner)]))?;
    let new_parent = permission_set(
        AcoKind::Folder,
        item_id(32),
        &grants(&[(ALICE, Owner), (CAROL, Read)]),
    )?;
    let changes = vec![PermissionChange::create(AcoKind::Folder, f, user(CAROL), Read)].into();

    Ok(MoveScenario {
        name: "direct grants survive a move",
        item,
        old_parent,
        new_parent,
        changes,
    })
}
