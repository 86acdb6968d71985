//! Propagating a user-authored change set across a hierarchy.
//!
//! The authored set is the template and the target is the reference item.
//! The template is checked against the target's snapshot before anything is
//! replayed: a change that neither applies there nor is already in effect
//! rejects the whole share.
//! Every affected item, the target included, receives only the entries that
//! [`replay`](canopy_perms::replay_detailed) still finds safe against its
//! current snapshot; for a fresh template that is the whole set on the target.
//! Folder writes complete before resource writes.
//!
//! Writes are not transactional. A failed phase leaves earlier writes in
//! place, and re-running the cascade picks up where it stopped because replay
//! skips what is already done.

use canopy_core::{AcoKind, ItemId, ItemTree, PreconditionError};
use canopy_perms::{replay_detailed, validate_authored, ConflictSkipped, PermissionChangeSet};
use canopy_store::{ItemTreeProvider, PermissionWriteApi, WorkingKey};

use crate::config::CascadeConfig;
use crate::error::Result;
use crate::scope::{Scope, Snapshots};
use crate::writes::{self, PlannedWrites};

/// A share to propagate.
#[derive(Debug, Clone)]
pub struct ShareRequest {
    /// The folder or resource the user edited.
    pub target: ItemId,
    /// The user-authored changes, addressed to `target`.
    pub changes: PermissionChangeSet,
    /// Key material for re-encrypting secrets to newly granted principals.
    pub key: WorkingKey,
}

/// Everything a share would write, computed without writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePlan {
    pub target: ItemId,
    pub scope: Scope,
    pub writes: PlannedWrites,
    /// Template entries dropped because an item diverged.
    pub skipped: Vec<ConflictSkipped>,
}

/// Outcome of a completed share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareReport {
    pub target: ItemId,
    pub folders_written: Vec<ItemId>,
    pub resources_written: Vec<ItemId>,
    pub changes_applied: usize,
    pub skipped: Vec<ConflictSkipped>,
    pub refreshed: bool,
}

/// Share cascade over a provider and a writer.
pub struct ShareCascade<P, W> {
    provider: P,
    writer: W,
    config: CascadeConfig,
}

impl<P, W> ShareCascade<P, W>
where
    P: ItemTreeProvider,
    W: PermissionWriteApi,
{
    pub fn new(provider: P, writer: W, config: CascadeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            writer,
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

    /// Compute the per-item changes without writing anything.
    pub async fn plan(&self, target: &ItemId, changes: &PermissionChangeSet) -> Result<SharePlan> {
        let tree = ItemTree::new(self.provider.get_all().await?);
        let root = tree.require(target)?;
        if !root.owned_by_current_user {
            return Err(PreconditionError::NotOwner(*target).into());
        }

        let scope = Scope::resolve(&tree, root, true);
        let snapshots = Snapshots::fetch(&self.provider, &scope.ids()).await?;

        let reference = snapshots.require(target)?;
        validate_authored(reference, changes)?;

        let mut writes = PlannedWrites::default();
        let mut skipped = Vec::new();

        for id in &scope.folders {
            let current = snapshots.require(id)?;
            let replayed = replay_detailed(AcoKind::Folder, *id, current, changes, reference)?;
            writes.push_folder(*id, replayed.changes);
            skipped.extend(replayed.skipped);
        }

        for id in &scope.resources {
            let current = snapshots.require(id)?;
            let replayed = replay_detailed(AcoKind::Resource, *id, current, changes, reference)?;
            writes.push_resource(*id, replayed.changes);
            skipped.extend(replayed.skipped);
        }

        tracing::debug!(
            target = %target,
            folders = scope.folders.len(),
            resources = scope.resources.len(),
            changes = writes.change_count(),
            skipped = skipped.len(),
            "share planned"
        );

        Ok(SharePlan {
            target: *target,
            scope,
            writes,
            skipped,
        })
    }

    /// Plan and write the share, then refresh the cache.
    pub async fn run(&self, request: &ShareRequest) -> Result<ShareReport> {
        tracing::info!(target = %request.target, changes = request.changes.len(), "share cascade starting");

        let plan = self.plan(&request.target, &request.changes).await?;

        writes::write_folders(&self.writer, &plan.writes, self.config.write_concurrency).await?;
        writes::write_resources(&self.writer, &plan.writes, &request.key).await?;

        let refreshed = self.config.refresh_after_write;
        if refreshed {
            self.provider.refresh_cache().await?;
        }

        let report = ShareReport {
            target: plan.target,
            folders_written: plan.writes.folder_ids(),
            resources_written: plan.writes.resource_ids(),
            changes_applied: plan.writes.change_count(),
            skipped: plan.skipped,
            refreshed,
        };

        tracing::info!(
            target = %report.target,
            folders = report.folders_written.len(),
            resources = report.resources_written.len(),
            changes = report.changes_applied,
            skipped = report.skipped.len(),
            "share cascade finished"
        );
        Ok(report)
    }
}
