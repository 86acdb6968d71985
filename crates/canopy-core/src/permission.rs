//! Permissions and per-item permission snapshots.
//!
//! A [`Permission`] grants one access level on one item (the ACO) to one
//! principal (the ARO). A [`PermissionSet`] is every permission of a single
//! item, fetched fresh for each operation and never persisted.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{ItemId, PermissionId, PrincipalId};

/// The kind of item a permission applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AcoKind {
    Folder,
    Resource,
}

/// The kind of principal a permission is granted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AroKind {
    User,
    Group,
}

/// Access level. Ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PermissionType {
    Read,
    Update,
    Owner,
}

impl PermissionType {
    /// Numeric code used by the remote API.
    pub const fn code(self) -> u8 {
        match self {
            PermissionType::Read => 1,
            PermissionType::Update => 7,
            PermissionType::Owner => 15,
        }
    }

    /// Parse a numeric code.
    pub fn from_code(code: u8) -> Result<Self, ValidationError> {
        match code {
            1 => Ok(PermissionType::Read),
            7 => Ok(PermissionType::Update),
            15 => Ok(PermissionType::Owner),
            other => Err(ValidationError::UnknownPermissionType(other)),
        }
    }

    pub const fn is_owner(self) -> bool {
        matches!(self, PermissionType::Owner)
    }
}

/// The principal-match key: an ARO kind plus its foreign key.
///
/// Permissions are matched across snapshots by principal, never by
/// permission id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub aro: AroKind,
    pub id: PrincipalId,
}

impl Principal {
    pub const fn user(id: PrincipalId) -> Self {
        Self {
            aro: AroKind::User,
            id,
        }
    }

    pub const fn group(id: PrincipalId) -> Self {
        Self {
            aro: AroKind::Group,
            id,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.aro {
            AroKind::User => "user",
            AroKind::Group => "group",
        };
        write!(f, "{}:{}", kind, self.id)
    }
}

/// A single grant. Unique per (aco, aco_foreign_key, principal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stored id. `None` for permissions authored locally and not yet written.
    pub id: Option<PermissionId>,
    pub aco: AcoKind,
    pub aco_foreign_key: ItemId,
    pub principal: Principal,
    pub access: PermissionType,
}

impl Permission {
    /// Create an unsaved permission.
    pub fn new(aco: AcoKind, item: ItemId, principal: Principal, access: PermissionType) -> Self {
        Self {
            id: None,
            aco,
            aco_foreign_key: item,
            principal,
            access,
        }
    }

    /// Attach a stored id.
    pub fn with_id(mut self, id: PermissionId) -> Self {
        self.id = Some(id);
        self
    }
}

/// The permissions of one item.
///
/// Insertion order is preserved; diff output order depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    aco: AcoKind,
    item: ItemId,
    permissions: Vec<Permission>,
}

impl PermissionSet {
    /// Create an empty snapshot for an item.
    pub fn new(aco: AcoKind, item: ItemId) -> Self {
        Self {
            aco,
            item,
            permissions: Vec::new(),
        }
    }

    /// Build a snapshot, checking that every permission belongs to `item`
    /// and that no principal appears twice.
    pub fn from_permissions(
        aco: AcoKind,
        item: ItemId,
        permissions: Vec<Permission>,
    ) -> Result<Self, ValidationError> {
        let mut set = Self::new(aco, item);
        for permission in permissions {
            set.insert(permission)?;
        }
        Ok(set)
    }

    /// Add a permission, enforcing item and principal uniqueness.
    pub fn insert(&mut self, permission: Permission) -> Result<(), ValidationError> {
        if permission.aco_foreign_key != self.item {
            return Err(ValidationError::ForeignPermission {
                expected: self.item,
                found: permission.aco_foreign_key,
            });
        }
        if permission.aco != self.aco {
            return Err(ValidationError::AcoMismatch {
                expected: self.aco,
                found: permission.aco,
            });
        }
        if self.get(&permission.principal).is_some() {
            return Err(ValidationError::DuplicatePrincipal(permission.principal));
        }
        self.permissions.push(permission);
        Ok(())
    }

    /// Shorthand used heavily by fixtures.
    pub fn grant(
        mut self,
        principal: Principal,
        access: PermissionType,
    ) -> Result<Self, ValidationError> {
        let permission = Permission::new(self.aco, self.item, principal, access);
        self.insert(permission)?;
        Ok(self)
    }

    pub fn aco(&self) -> AcoKind {
        self.aco
    }

    pub fn item(&self) -> ItemId {
        self.item
    }

    /// The permission held by `principal`, if any.
    pub fn get(&self, principal: &Principal) -> Option<&Permission> {
        self.permissions.iter().find(|p| &p.principal == principal)
    }

    pub fn contains(&self, principal: &Principal) -> bool {
        self.get(principal).is_some()
    }

    /// Access level held by `principal`, if any.
    pub fn access_of(&self, principal: &Principal) -> Option<PermissionType> {
        self.get(principal).map(|p| p.access)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }

    pub fn principals(&self) -> impl Iterator<Item = &Principal> {
        self.permissions.iter().map(|p| &p.principal)
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Permissions at OWNER level.
    pub fn owners(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter().filter(|p| p.access.is_owner())
    }

    /// Exactly one permission, an OWNER grant held by a user.
    pub fn is_personal(&self) -> bool {
        match self.permissions.as_slice() {
            [only] => only.access.is_owner() && only.principal.aro == AroKind::User,
            _ => false,
        }
    }

    pub fn is_shared(&self) -> bool {
        self.permissions.len() > 1
    }

    /// Same principals at the same access levels, ignoring ids and order.
    pub fn same_grants(&self, other: &PermissionSet) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|p| other.access_of(&p.principal) == Some(p.access))
    }

    /// Consume into the underlying permissions.
    pub fn into_permissions(self) -> Vec<Permission> {
        self.permissions
    }

    /// Change the access level held by `principal` in place. Returns false when
    /// the principal holds nothing.
    pub fn set_access(&mut self, principal: &Principal, access: PermissionType) -> bool {
        match self.permissions.iter_mut().find(|p| &p.principal == principal) {
            Some(existing) => {
                existing.access = access;
                true
            }
            None => false,
        }
    }

    /// Give every permission that has no row id one from `mint`.
    pub fn assign_ids(&mut self, mut mint: impl FnMut() -> PermissionId) {
        for permission in self.permissions.iter_mut().filter(|p| p.id.is_none()) {
            permission.id = Some(mint());
        }
    }

    /// Remove the permission for `principal`, returning it.
    pub fn remove(&mut self, principal: &Principal) -> Option<Permission> {
        let index = self
            .permissions
            .iter()
            .position(|p| &p.principal == principal)?;
        Some(self.permissions.remove(index))
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a Permission;
    type IntoIter = std::slice::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.permissions.iter()
    }
}
