//! Strict application of change sets to snapshots.

use std::collections::HashSet;

use canopy_core::{validate_permission_set, Permission, PermissionSet, ValidationError};

use crate::change::{ChangeScenario, PermissionChange};
use crate::changeset::PermissionChangeSet;
use crate::error::{PermsError, Result};

/// Apply the changes addressed to `set`'s item, returning the new snapshot.
///
/// Changes for other items are ignored. Every change must hold against the
/// snapshot: a create needs the principal absent, updates and deletes need it
/// present. Created permissions carry no id.
pub fn apply(set: &PermissionSet, changes: &PermissionChangeSet) -> Result<PermissionSet> {
    let mut next = set.clone();

    for change in changes.iter().filter(|c| c.aco_foreign_key == set.item()) {
        let rejected = |reason| PermsError::ChangeRejected {
            item: set.item(),
            principal: change.principal,
            reason,
        };

        match change.scenario {
            ChangeScenario::Create => {
                if next.contains(&change.principal) {
                    return Err(rejected("principal already holds a permission"));
                }
                next.insert(Permission::new(
                    set.aco(),
                    set.item(),
                    change.principal,
                    change.access,
                ))?;
            }
            ChangeScenario::Update { .. } => {
                if !next.set_access(&change.principal, change.access) {
                    return Err(rejected("no permission to update"));
                }
            }
            ChangeScenario::Delete { .. } => {
                if next.remove(&change.principal).is_none() {
                    return Err(rejected("no permission to delete"));
                }
            }
        }
    }

    Ok(next)
}

/// Validate a user-authored change set for `target` before it is used as a
/// cascade template.
///
/// The set must address only the target item, mention each principal once,
/// and leave at least one owner. Each change must either apply cleanly to the
/// target's snapshot or already be in effect there, so a resubmitted set
/// passes while a create over a different grant, or an update of a missing
/// one, is rejected.
pub fn validate_authored(target: &PermissionSet, changes: &PermissionChangeSet) -> Result<()> {
    let mut seen = HashSet::new();

    for change in changes {
        if change.aco_foreign_key != target.item() {
            return Err(ValidationError::ForeignPermission {
                expected: target.item(),
                found: change.aco_foreign_key,
            }
            .into());
        }
        if change.aco != target.aco() {
            return Err(ValidationError::AcoMismatch {
                expected: target.aco(),
                found: change.aco,
            }
            .into());
        }
        if !seen.insert(change.principal) {
            return Err(ValidationError::DuplicatePrincipal(change.principal).into());
        }
    }

    let pending: PermissionChangeSet = changes
        .iter()
        .filter(|change| !in_effect(target, change))
        .cloned()
        .collect();
    let after = apply(target, &pending)?;
    validate_permission_set(&after)?;
    Ok(())
}

/// Whether `set` already shows the end state `change` describes.
fn in_effect(set: &PermissionSet, change: &PermissionChange) -> bool {
    match change.scenario {
        ChangeScenario::Create | ChangeScenario::Update { .. } => {
            set.access_of(&change.principal) == Some(change.access)
        }
        ChangeScenario::Delete { .. } => !set.contains(&change.principal),
    }
}
