//! Authorization changes implied by re-parenting an item.
//!
//! A move swaps the permissions an item inherits from its old parent for
//! those of its new parent. For every affected item:
//!
//! - **Added**: principals on the new parent that the item lacks, unless the
//!   old parent already granted them the same level (the item lost them on
//!   purpose)
//! - **Removed**: principals on the old parent, absent from the new parent,
//!   still present on the item
//!
//! Grants held directly on the item and unrelated to either parent are never
//! touched. The move itself always happens; the permission changes only with
//! the caller's confirmation.

use canopy_core::{validate_move_target, ItemId, ItemTree, PermissionSet};
use canopy_perms::{PermissionChange, PermissionChangeSet};
use canopy_store::{ItemTreeProvider, PermissionWriteApi, WorkingKey};

use crate::config::CascadeConfig;
use crate::confirm::{ConfirmationPrompt, MoveDecision};
use crate::error::Result;
use crate::scope::{Scope, Snapshots};
use crate::writes::{self, PlannedWrites};

/// A move to perform.
#[derive(Debug, Clone)]
pub struct MoveRequest {
    pub item: ItemId,
    /// New parent folder; `None` moves to the root.
    pub destination: Option<ItemId>,
    /// Key material for re-encrypting secrets to newly granted principals.
    pub key: WorkingKey,
}

/// What a move would change, computed without writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub item: ItemId,
    pub from: Option<ItemId>,
    pub to: Option<ItemId>,
    /// Set when a personal item moves between personal-or-root contexts.
    /// No snapshot was read and no change is possible.
    pub short_circuited: bool,
    pub scope: Scope,
    pub writes: PlannedWrites,
}

impl MovePlan {
    /// Whether the caller must choose between keeping and changing.
    pub fn needs_confirmation(&self) -> bool {
        !self.writes.is_empty()
    }
}

/// Outcome of a completed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    pub item: ItemId,
    pub from: Option<ItemId>,
    pub to: Option<ItemId>,
    pub short_circuited: bool,
    /// The caller's answer, when asked.
    pub decision: Option<MoveDecision>,
    pub changes_planned: usize,
    pub changes_applied: usize,
    pub folders_written: Vec<ItemId>,
    pub resources_written: Vec<ItemId>,
    pub refreshed: bool,
}

/// Changes moving `item` from `old_parent` to `new_parent` implies.
///
/// `None` parents grant nothing. Owner removals that would leave the item
/// without an owner are dropped.
pub fn move_diff(
    item: &PermissionSet,
    old_parent: Option<&PermissionSet>,
    new_parent: Option<&PermissionSet>,
) -> PermissionChangeSet {
    let mut changes = PermissionChangeSet::new();
    let mut owners = item.owners().count();

    for granted in new_parent.into_iter().flat_map(|set| set.iter()) {
        if item.contains(&granted.principal) {
            continue;
        }
        if old_parent.and_then(|set| set.access_of(&granted.principal)) == Some(granted.access) {
            continue;
        }
        if granted.access.is_owner() {
            owners += 1;
        }
        changes.push(PermissionChange::create(
            item.aco(),
            item.item(),
            granted.principal,
            granted.access,
        ));
    }

    for inherited in old_parent.into_iter().flat_map(|set| set.iter()) {
        if new_parent.map_or(false, |set| set.contains(&inherited.principal)) {
            continue;
        }
        let Some(held) = item.get(&inherited.principal) else {
            continue;
        };
        if held.access.is_owner() {
            if owners <= 1 {
                tracing::debug!(
                    item = %item.item(),
                    principal = %held.principal,
                    "kept last owner on move"
                );
                continue;
            }
            owners -= 1;
        }
        changes.push(PermissionChange::delete(held));
    }

    changes
}

/// Move cascade over a provider, a writer, and a confirmation prompt.
pub struct MoveCascade<P, W, C> {
    provider: P,
    writer: W,
    prompt: C,
    config: CascadeConfig,
}

impl<P, W, C> MoveCascade<P, W, C>
where
    P: ItemTreeProvider,
    W: PermissionWriteApi,
    C: ConfirmationPrompt,
{
    pub fn new(provider: P, writer: W, prompt: C, config: CascadeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            writer,
            prompt,
            config,
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Validate the move and compute its permission changes.
    pub async fn plan(&self, item: &ItemId, destination: Option<ItemId>) -> Result<MovePlan> {
        let tree = ItemTree::new(self.provider.get_all().await?);
        validate_move_target(&tree, item, destination.as_ref())?;

        let moved = tree.require(item)?;
        let from = moved.parent_id;

        let mut plan = MovePlan {
            item: *item,
            from,
            to: destination,
            short_circuited: false,
            scope: Scope::default(),
            writes: PlannedWrites::default(),
        };

        if moved.personal
            && tree.is_personal_or_root(from.as_ref())
            && tree.is_personal_or_root(destination.as_ref())
        {
            tracing::debug!(item = %item, "personal move needs no permission change");
            plan.short_circuited = true;
            return Ok(plan);
        }

        // Moving an item the user does not own still re-parents what they
        // own beneath it.
        let scope = Scope::resolve(&tree, moved, moved.owned_by_current_user);

        let mut ids = scope.ids();
        ids.extend(from);
        ids.extend(destination);
        let snapshots = Snapshots::fetch(&self.provider, &ids).await?;

        let old_parent = snapshots.parent(from.as_ref());
        let new_parent = snapshots.parent(destination.as_ref());

        for id in &scope.folders {
            let changes = move_diff(snapshots.require(id)?, old_parent, new_parent);
            plan.writes.push_folder(*id, changes);
        }
        for id in &scope.resources {
            let changes = move_diff(snapshots.require(id)?, old_parent, new_parent);
            plan.writes.push_resource(*id, changes);
        }

        tracing::debug!(
            item = %item,
            folders = scope.folders.len(),
            resources = scope.resources.len(),
            changes = plan.writes.change_count(),
            "move planned"
        );
        plan.scope = scope;
        Ok(plan)
    }

    /// Plan the move, confirm and write any permission changes, move, then
    /// refresh the cache.
    pub async fn run(&self, request: &MoveRequest) -> Result<MoveReport> {
        tracing::info!(item = %request.item, destination = ?request.destination, "move cascade starting");

        let plan = self.plan(&request.item, request.destination).await?;

        let mut decision = None;
        let mut applied = false;
        if plan.needs_confirmation() {
            let answer = self.prompt.confirm(plan.from, plan.to).await;
            decision = Some(answer);

            if answer.apply {
                writes::write_resources(&self.writer, &plan.writes, &request.key).await?;
                writes::write_folders(&self.writer, &plan.writes, self.config.write_concurrency)
                    .await?;
                applied = true;
            } else {
                tracing::info!(item = %plan.item, "keeping current permissions");
            }
        }

        if let Err(err) = self.provider.move_item(&plan.item, plan.to).await {
            tracing::warn!(item = %plan.item, error = %err, "move failed");
            return Err(err.into());
        }

        let refreshed = self.config.refresh_after_write;
        if refreshed {
            self.provider.refresh_cache().await?;
        }

        let report = MoveReport {
            item: plan.item,
            from: plan.from,
            to: plan.to,
            short_circuited: plan.short_circuited,
            decision,
            changes_planned: plan.writes.change_count(),
            changes_applied: if applied { plan.writes.change_count() } else { 0 },
            folders_written: if applied { plan.writes.folder_ids() } else { Vec::new() },
            resources_written: if applied { plan.writes.resource_ids() } else { Vec::new() },
            refreshed,
        };

        tracing::info!(
            item = %report.item,
            short_circuited = report.short_circuited,
            planned = report.changes_planned,
            applied = report.changes_applied,
            "move cascade finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use canopy_core::{AcoKind, Item, PermissionType, PreconditionError, Principal, PrincipalId};
    use canopy_store::{BackendCall, MemoryBackend};

    use crate::confirm::{AlwaysApply, AlwaysKeep};
    use crate::error::CascadeError;

    fn id(n: u8) -> ItemId {
        ItemId::from_bytes([n; 16])
    }

    fn user(n: u8) -> Principal {
        Principal::user(PrincipalId::from_bytes([n; 16]))
    }

    const ALICE: u8 = 1;
    const BOB: u8 = 2;
    const CAROL: u8 = 3;

    fn set(aco: AcoKind, item: ItemId, grants: &[(u8, PermissionType)]) -> PermissionSet {
        grants
            .iter()
            .fold(PermissionSet::new(aco, item), |set, &(n, access)| {
                set.grant(user(n), access).unwrap()
            })
    }

    #[derive(Default)]
    struct CountingPrompt {
        asked: AtomicUsize,
        apply: bool,
    }

    #[async_trait]
    impl ConfirmationPrompt for CountingPrompt {
        async fn confirm(&self, _old: Option<ItemId>, _new: Option<ItemId>) -> MoveDecision {
            self.asked.fetch_add(1, Ordering::SeqCst);
            MoveDecision { apply: self.apply }
        }
    }

    #[test]
    fn test_direct_grants_survive_and_new_parent_grants_arrive() {
        use PermissionType::*;
        let f = set(AcoKind::Folder, id(10), &[(ALICE, Owner), (BOB, Read)]);
        let p = set(AcoKind::Folder, id(11), &[(ALICE, Owner)]);
        let d = set(AcoKind::Folder, id(12), &[(ALICE, Owner), (CAROL, Read)]);

        let changes = move_diff(&f, Some(&p), Some(&d));

        assert_eq!(changes.len(), 1);
        let change = &changes.as_slice()[0];
        assert!(change.is_create());
        assert_eq!(change.principal, user(CAROL));
        assert_eq!(change.access, Read);
        assert_eq!(change.aco_foreign_key, id(10));
    }

    #[test]
    fn test_identical_parents_change_nothing() {
        use PermissionType::*;
        let item = set(AcoKind::Resource, id(10), &[(ALICE, Owner)]);
        let p = set(AcoKind::Folder, id(11), &[(ALICE, Owner), (BOB, Update)]);
        let d = set(AcoKind::Folder, id(12), &[(ALICE, Owner), (BOB, Update)]);

        assert!(move_diff(&item, Some(&p), Some(&d)).is_empty());
    }

    #[test]
    fn test_inherited_grants_removed() {
        use PermissionType::*;
        let item = set(AcoKind::Folder, id(10), &[(ALICE, Owner), (BOB, Read)]);
        let p = set(AcoKind::Folder, id(11), &[(ALICE, Owner), (BOB, Read)]);

        let changes = move_diff(&item, Some(&p), None);

        assert_eq!(changes.len(), 1);
        assert!(changes.as_slice()[0].is_delete());
        assert_eq!(changes.as_slice()[0].principal, user(BOB));
    }

    #[test]
    fn test_last_owner_never_removed() {
        use PermissionType::*;
        let item = set(AcoKind::Folder, id(10), &[(BOB, Owner)]);
        let p = set(AcoKind::Folder, id(11), &[(BOB, Owner)]);
        let d = set(AcoKind::Folder, id(12), &[(ALICE, Read)]);

        let changes = move_diff(&item, Some(&p), Some(&d));
        assert_eq!(changes.len(), 1);
        assert!(changes.as_slice()[0].is_create());

        // An incoming owner makes the removal safe.
        let d = set(AcoKind::Folder, id(12), &[(ALICE, Owner)]);
        assert_eq!(move_diff(&item, Some(&p), Some(&d)).len(), 2);
    }

    /// Shared folder 1 (alice owner, bob read) holding folder 3 and resource
    /// 4; personal folder 2; resource 5 at the root, personal.
    fn backend() -> Arc<MemoryBackend> {
        use PermissionType::*;
        let backend = Arc::new(MemoryBackend::new());
        backend.insert(
            Item::folder(id(1), None).shared(),
            set(AcoKind::Folder, id(1), &[(ALICE, Owner), (BOB, Read)]),
        );
        backend.insert(
            Item::folder(id(2), None),
            set(AcoKind::Folder, id(2), &[(ALICE, Owner)]),
        );
        backend.insert(
            Item::folder(id(3), Some(id(1))).shared(),
            set(AcoKind::Folder, id(3), &[(ALICE, Owner), (BOB, Read)]),
        );
        backend.insert(
            Item::resource(id(4), Some(id(1))).shared(),
            set(AcoKind::Resource, id(4), &[(ALICE, Owner), (BOB, Read)]),
        );
        backend.insert(
            Item::resource(id(5), None),
            set(AcoKind::Resource, id(5), &[(ALICE, Owner)]),
        );
        backend
    }

    fn request(item: ItemId, destination: Option<ItemId>) -> MoveRequest {
        MoveRequest {
            item,
            destination,
            key: WorkingKey::new(b"key".to_vec()),
        }
    }

    #[tokio::test]
    async fn test_personal_move_short_circuits() {
        let backend = backend();
        let prompt = Arc::new(CountingPrompt::default());
        let cascade = MoveCascade::new(
            backend.clone(),
            backend.clone(),
            prompt.clone(),
            CascadeConfig::default(),
        )
        .unwrap();

        let report = cascade.run(&request(id(5), Some(id(2)))).await.unwrap();

        assert!(report.short_circuited);
        assert_eq!(backend.permission_fetches(), 0);
        assert_eq!(backend.permission_writes(), 0);
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 0);
        assert_eq!(backend.item(&id(5)).unwrap().parent_id, Some(id(2)));
        assert_eq!(backend.refreshes(), 1);
    }

    #[tokio::test]
    async fn test_move_out_of_shared_folder_revokes_inherited() {
        let backend = backend();
        let cascade =
            MoveCascade::new(backend.clone(), backend.clone(), AlwaysApply, CascadeConfig::default())
                .unwrap();

        let report = cascade.run(&request(id(3), Some(id(2)))).await.unwrap();

        assert!(!report.short_circuited);
        assert_eq!(report.decision, Some(MoveDecision::APPLY));
        assert_eq!(report.changes_applied, 1);
        assert!(!backend.permissions_of(&id(3)).unwrap().contains(&user(BOB)));
        assert!(backend.item(&id(3)).unwrap().personal);
        assert_eq!(backend.item(&id(3)).unwrap().parent_id, Some(id(2)));
    }

    #[tokio::test]
    async fn test_keep_moves_without_writing() {
        let backend = backend();
        let cascade =
            MoveCascade::new(backend.clone(), backend.clone(), AlwaysKeep, CascadeConfig::default())
                .unwrap();

        let report = cascade.run(&request(id(4), None)).await.unwrap();

        assert_eq!(report.decision, Some(MoveDecision::KEEP));
        assert_eq!(report.changes_planned, 1);
        assert_eq!(report.changes_applied, 0);
        assert_eq!(backend.permission_writes(), 0);
        assert!(backend.permissions_of(&id(4)).unwrap().contains(&user(BOB)));
        assert_eq!(backend.item(&id(4)).unwrap().parent_id, None);
    }

    #[tokio::test]
    async fn test_resources_written_before_folders_then_moved() {
        let backend = backend();
        // Personal folder 6 holds resource 7; move it into shared folder 1.
        backend.insert(
            Item::folder(id(6), None),
            set(AcoKind::Folder, id(6), &[(ALICE, PermissionType::Owner)]),
        );
        backend.insert(
            Item::resource(id(7), Some(id(6))),
            set(AcoKind::Resource, id(7), &[(ALICE, PermissionType::Owner)]),
        );
        let cascade =
            MoveCascade::new(backend.clone(), backend.clone(), AlwaysApply, CascadeConfig::default())
                .unwrap();

        cascade.run(&request(id(6), Some(id(1)))).await.unwrap();

        let calls = backend.calls();
        let resources = calls
            .iter()
            .position(|c| matches!(c, BackendCall::WriteResources { .. }))
            .unwrap();
        let folders = calls
            .iter()
            .position(|c| matches!(c, BackendCall::WriteFolder { .. }))
            .unwrap();
        let moved = calls
            .iter()
            .position(|c| matches!(c, BackendCall::Move { .. }))
            .unwrap();
        assert!(resources < folders && folders < moved);

        assert_eq!(
            backend.permissions_of(&id(7)).unwrap().access_of(&user(BOB)),
            Some(PermissionType::Read)
        );
        assert_eq!(backend.shared_secrets(), vec![(id(7), user(BOB))]);
    }

    #[tokio::test]
    async fn test_illegal_moves_rejected_before_any_call() {
        let backend = backend();
        let cascade =
            MoveCascade::new(backend.clone(), backend.clone(), AlwaysApply, CascadeConfig::default())
                .unwrap();

        let err = cascade.run(&request(id(1), Some(id(3)))).await.unwrap_err();
        assert!(matches!(
            err,
            CascadeError::Precondition(PreconditionError::MoveIntoDescendant { .. })
        ));

        let err = cascade.run(&request(id(5), None)).await.unwrap_err();
        assert!(matches!(
            err,
            CascadeError::Precondition(PreconditionError::AlreadyInDestination(_))
        ));

        let err = cascade.run(&request(id(2), Some(id(5)))).await.unwrap_err();
        assert!(matches!(
            err,
            CascadeError::Precondition(PreconditionError::DestinationNotFolder(_))
        ));

        assert!(!err.is_retryable());
        assert_eq!(backend.permission_fetches(), 0);
        assert!(!backend
            .calls()
            .iter()
            .any(|c| matches!(c, BackendCall::Move { .. })));
    }

    #[tokio::test]
    async fn test_failed_move_is_retryable() {
        let backend = backend();
        backend.fail_writes_for(id(5));
        let cascade =
            MoveCascade::new(backend.clone(), backend.clone(), AlwaysApply, CascadeConfig::default())
                .unwrap();

        let err = cascade.run(&request(id(5), Some(id(2)))).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(backend.refreshes(), 0);
    }
}
