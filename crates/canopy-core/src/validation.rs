//! Shape and structure checks run before any mutation.

use std::collections::HashSet;

use crate::error::{MoveCheckError, PreconditionError, ValidationError};
use crate::item::ItemTree;
use crate::permission::PermissionSet;
use crate::types::ItemId;

/// Validate a permission snapshot for an existing item.
///
/// Checks:
/// - Every permission targets the snapshot's item and ACO kind
/// - No principal appears twice
/// - At least one OWNER remains
pub fn validate_permission_set(set: &PermissionSet) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();

    for permission in set.iter() {
        if permission.aco_foreign_key != set.item() {
            return Err(ValidationError::ForeignPermission {
                expected: set.item(),
                found: permission.aco_foreign_key,
            });
        }
        if permission.aco != set.aco() {
            return Err(ValidationError::AcoMismatch {
                expected: set.aco(),
                found: permission.aco,
            });
        }
        if !seen.insert(permission.principal) {
            return Err(ValidationError::DuplicatePrincipal(permission.principal));
        }
    }

    if set.owners().next().is_none() {
        return Err(ValidationError::NoOwnerRemaining(set.item()));
    }

    Ok(())
}

/// Validate a re-parenting request against the forest.
///
/// Rejects no-op moves (destination equals the current parent, which also
/// covers root-to-root) before delegating the structural checks to
/// [`ItemTree::validate_move`].
pub fn validate_move_target(
    tree: &ItemTree,
    item: &ItemId,
    destination: Option<&ItemId>,
) -> Result<(), MoveCheckError> {
    let current = tree.require(item)?;

    if current.parent_id.as_ref() == destination {
        return Err(PreconditionError::AlreadyInDestination(*item).into());
    }

    tree.validate_move(item, destination)
}
