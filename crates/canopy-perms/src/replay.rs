//! Conflict-aware replay of a change template onto another item.
//!
//! A template is computed once for a reference item. Replaying it onto a
//! different item keeps only the entries whose precondition still holds
//! against that item's *current* snapshot:
//!
//! - CREATE: the principal holds nothing on the item yet
//! - DELETE: the principal still holds exactly the level being deleted
//! - UPDATE: the principal holds a different level than the new one, and the
//!   reference item showed that same level before the template was computed
//!
//! Anything else is dropped and reported as [`ConflictSkipped`]. Replay may
//! under-apply; it never emits a change whose precondition fails.

use canopy_core::{AcoKind, ItemId, PermissionSet, PermissionType, Principal};

use crate::change::{ChangeScenario, PermissionChange};
use crate::changeset::PermissionChangeSet;
use crate::error::{PermsError, Result};

/// Why a template entry was not replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// CREATE, but the principal already holds a permission.
    AlreadyGranted,
    /// UPDATE or DELETE, but the principal holds nothing.
    NotGranted,
    /// DELETE, but the principal's level changed independently.
    AccessChanged,
    /// UPDATE, but the principal is already at the new level.
    AlreadyAtTarget,
    /// UPDATE, but the item diverged from the reference for this principal.
    Diverged,
}

/// A template entry dropped by replay. Expected and loggable, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictSkipped {
    pub item: ItemId,
    pub principal: Principal,
    pub reason: SkipReason,
}

/// Outcome of [`replay_detailed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replay {
    pub changes: PermissionChangeSet,
    pub skipped: Vec<ConflictSkipped>,
}

/// Replay `template` onto `item`, returning only the applicable changes.
pub fn replay(
    aco: AcoKind,
    item: ItemId,
    current: &PermissionSet,
    template: &PermissionChangeSet,
    reference: &PermissionSet,
) -> Result<PermissionChangeSet> {
    replay_detailed(aco, item, current, template, reference).map(|r| r.changes)
}

/// Replay `template` onto `item`, also reporting every skipped entry.
///
/// `reference` is the reference item's snapshot taken *before* the template
/// was computed.
pub fn replay_detailed(
    aco: AcoKind,
    item: ItemId,
    current: &PermissionSet,
    template: &PermissionChangeSet,
    reference: &PermissionSet,
) -> Result<Replay> {
    if current.item() != item {
        return Err(PermsError::SnapshotMismatch {
            expected: item,
            found: current.item(),
        });
    }

    let mut out = Replay::default();

    for change in template {
        match decide(change, current, reference) {
            Ok(applied) => out.changes.push(PermissionChange {
                aco,
                aco_foreign_key: item,
                ..applied
            }),
            Err(reason) => {
                tracing::debug!(
                    item = %item,
                    principal = %change.principal,
                    ?reason,
                    "replay skipped stale change"
                );
                out.skipped.push(ConflictSkipped {
                    item,
                    principal: change.principal,
                    reason,
                });
            }
        }
    }

    Ok(out)
}

/// Check one template entry against the current snapshot. On success the
/// returned change carries the current row's id.
fn decide(
    change: &PermissionChange,
    current: &PermissionSet,
    reference: &PermissionSet,
) -> std::result::Result<PermissionChange, SkipReason> {
    let held = current.get(&change.principal);

    match change.scenario {
        ChangeScenario::Create => match held {
            Some(_) => Err(SkipReason::AlreadyGranted),
            None => Ok(PermissionChange {
                scenario: ChangeScenario::Create,
                ..change.clone()
            }),
        },

        ChangeScenario::Delete { .. } => match held {
            None => Err(SkipReason::NotGranted),
            Some(existing) if existing.access != change.access => Err(SkipReason::AccessChanged),
            Some(existing) => Ok(PermissionChange {
                scenario: ChangeScenario::Delete { id: existing.id },
                ..change.clone()
            }),
        },

        ChangeScenario::Update { .. } => {
            let existing = held.ok_or(SkipReason::NotGranted)?;
            if existing.access == change.access {
                return Err(SkipReason::AlreadyAtTarget);
            }
            if !same_as_reference(reference, &change.principal, existing.access) {
                return Err(SkipReason::Diverged);
            }
            Ok(PermissionChange {
                scenario: ChangeScenario::Update {
                    from_id: existing.id,
                },
                ..change.clone()
            })
        }
    }
}

fn same_as_reference(reference: &PermissionSet, principal: &Principal, level: PermissionType) -> bool {
    reference.access_of(principal) == Some(level)
}
