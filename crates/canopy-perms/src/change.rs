//! A single permission mutation.

use serde::{Deserialize, Serialize};

use canopy_core::{AcoKind, ItemId, Permission, PermissionId, PermissionType, Principal};

/// What a change does to the (item, principal) pair it addresses.
///
/// Each variant carries exactly the fields meaningful for it: a create has no
/// prior row, while updates and deletes point at the row they modify when it
/// is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeScenario {
    Create,
    Update { from_id: Option<PermissionId> },
    Delete { id: Option<PermissionId> },
}

/// One mutation of one item's permissions.
///
/// For a delete, `access` is the level being removed; replay uses it as the
/// precondition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionChange {
    pub aco: AcoKind,
    pub aco_foreign_key: ItemId,
    pub principal: Principal,
    pub access: PermissionType,
    pub scenario: ChangeScenario,
}

impl PermissionChange {
    /// Grant `access` to a principal that holds nothing on the item.
    pub fn create(aco: AcoKind, item: ItemId, principal: Principal, access: PermissionType) -> Self {
        Self {
            aco,
            aco_foreign_key: item,
            principal,
            access,
            scenario: ChangeScenario::Create,
        }
    }

    /// Change the level of an existing permission.
    pub fn update(existing: &Permission, access: PermissionType) -> Self {
        Self {
            aco: existing.aco,
            aco_foreign_key: existing.aco_foreign_key,
            principal: existing.principal,
            access,
            scenario: ChangeScenario::Update {
                from_id: existing.id,
            },
        }
    }

    /// Remove an existing permission.
    pub fn delete(existing: &Permission) -> Self {
        Self {
            aco: existing.aco,
            aco_foreign_key: existing.aco_foreign_key,
            principal: existing.principal,
            access: existing.access,
            scenario: ChangeScenario::Delete { id: existing.id },
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self.scenario, ChangeScenario::Create)
    }

    pub fn is_update(&self) -> bool {
        matches!(self.scenario, ChangeScenario::Update { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self.scenario, ChangeScenario::Delete { .. })
    }

    /// Copy this change onto another item.
    ///
    /// Permission ids belong to the original item's rows, so they are
    /// dropped; the writer resolves rows by principal.
    pub fn retarget(&self, aco: AcoKind, item: ItemId) -> Self {
        let scenario = match self.scenario {
            ChangeScenario::Create => ChangeScenario::Create,
            ChangeScenario::Update { .. } => ChangeScenario::Update { from_id: None },
            ChangeScenario::Delete { .. } => ChangeScenario::Delete { id: None },
        };
        Self {
            aco,
            aco_foreign_key: item,
            principal: self.principal,
            access: self.access,
            scenario,
        }
    }
}
