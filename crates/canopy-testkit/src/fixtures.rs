//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a [`MemoryBackend`] seeded
//! through grant lists, with ownership and personal flags derived the way
//! the remote side derives them.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::RngCore;

use canopy::{
    CascadeConfig, ConfirmationPrompt, MoveCascade, MoveDecision, MoveRequest, ShareCascade,
    ShareRequest,
};
use canopy_core::{
    AcoKind, Item, ItemId, Permission, PermissionSet, PermissionType, Principal, PrincipalId,
    ValidationError,
};
use canopy_perms::{PermissionChange, PermissionChangeSet};
use canopy_store::{MemoryBackend, WorkingKey};

/// Deterministic item id.
pub fn item_id(n: u8) -> ItemId {
    ItemId::from_bytes([n; 16])
}

/// Deterministic user principal.
pub fn user(n: u8) -> Principal {
    Principal::user(PrincipalId::from_bytes([n; 16]))
}

/// Deterministic group principal. Never equal to `user(n)`.
pub fn group(n: u8) -> Principal {
    Principal::group(PrincipalId::from_bytes([n; 16]))
}

/// Build a snapshot from a grant list.
pub fn permission_set(
    aco: AcoKind,
    item: ItemId,
    grants: &[(Principal, PermissionType)],
) -> Result<PermissionSet, ValidationError> {
    let permissions = grants
        .iter()
        .map(|&(principal, access)| Permission::new(aco, item, principal, access))
        .collect();
    PermissionSet::from_permissions(aco, item, permissions)
}

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}

type Backend = Arc<MemoryBackend>;

/// A memory backend seen from one user's account.
pub struct TestFixture {
    pub backend: Backend,
    /// The current user.
    pub me: Principal,
    pub key: WorkingKey,
}

impl TestFixture {
    /// Empty backend; the current user is `user(1)`.
    pub fn new() -> Self {
        let mut key = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self {
            backend: Arc::new(MemoryBackend::new()),
            me: user(1),
            key: WorkingKey::new(key),
        }
    }

    /// Add a folder. Ownership and the personal flag follow from `grants`.
    pub fn folder(
        &self,
        id: ItemId,
        parent: Option<ItemId>,
        grants: &[(Principal, PermissionType)],
    ) -> Result<ItemId, ValidationError> {
        self.insert(AcoKind::Folder, id, parent, grants)
    }

    /// Add a resource. Ownership and the personal flag follow from `grants`.
    pub fn resource(
        &self,
        id: ItemId,
        parent: Option<ItemId>,
        grants: &[(Principal, PermissionType)],
    ) -> Result<ItemId, ValidationError> {
        self.insert(AcoKind::Resource, id, parent, grants)
    }

    fn insert(
        &self,
        kind: AcoKind,
        id: ItemId,
        parent_id: Option<ItemId>,
        grants: &[(Principal, PermissionType)],
    ) -> Result<ItemId, ValidationError> {
        let set = permission_set(kind, id, grants)?;
        let item = Item {
            id,
            kind,
            parent_id,
            owned_by_current_user: set.access_of(&self.me) == Some(PermissionType::Owner),
            personal: set.is_personal(),
        };
        self.backend.insert(item, set);
        Ok(id)
    }

    /// Current access of `principal` on `id`.
    pub fn access(&self, id: &ItemId, principal: &Principal) -> Option<PermissionType> {
        self.backend
            .permissions_of(id)
            .and_then(|set| set.access_of(principal))
    }

    pub fn parent_of(&self, id: &ItemId) -> Option<ItemId> {
        self.backend.item(id).and_then(|item| item.parent_id)
    }

    /// A one-entry authored set granting `access` on `target`.
    pub fn grant(
        &self,
        target: ItemId,
        principal: Principal,
        access: PermissionType,
    ) -> PermissionChangeSet {
        let aco = self
            .backend
            .item(&target)
            .map_or(AcoKind::Folder, |item| item.kind);
        vec![PermissionChange::create(aco, target, principal, access)].into()
    }

    pub fn share_cascade(&self, config: CascadeConfig) -> canopy::Result<ShareCascade<Backend, Backend>> {
        ShareCascade::new(self.backend.clone(), self.backend.clone(), config)
    }

    pub fn move_cascade<C: ConfirmationPrompt>(
        &self,
        prompt: C,
        config: CascadeConfig,
    ) -> canopy::Result<MoveCascade<Backend, Backend, C>> {
        MoveCascade::new(self.backend.clone(), self.backend.clone(), prompt, config)
    }

    pub fn share_request(&self, target: ItemId, changes: PermissionChangeSet) -> ShareRequest {
        ShareRequest {
            target,
            changes,
            key: self.key.clone(),
        }
    }

    pub fn move_request(&self, item: ItemId, destination: Option<ItemId>) -> MoveRequest {
        MoveRequest {
            item,
            destination,
            key: self.key.clone(),
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A prompt that answers with a fixed decision and records every question.
pub struct RecordingPrompt {
    decision: MoveDecision,
    asked: Mutex<Vec<(Option<ItemId>, Option<ItemId>)>>,
}

impl RecordingPrompt {
    pub fn new(decision: MoveDecision) -> Self {
        Self {
            decision,
            asked: Mutex::new(Vec::new()),
        }
    }

    /// (old context, new context) pairs asked so far.
    pub fn asked(&self) -> Vec<(Option<ItemId>, Option<ItemId>)> {
        self.asked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ConfirmationPrompt for RecordingPrompt {
    async fn confirm(&self, old_context: Option<ItemId>, new_context: Option<ItemId>) -> MoveDecision {
        self.asked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((old_context, new_context));
        self.decision
    }
}
