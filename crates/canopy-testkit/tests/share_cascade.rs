//! Share cascade against a memory backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use canopy::store::{MemoryBackend, PermissionWriteApi, WorkingKey};
use canopy::{CascadeConfig, ShareCascade};
use canopy_core::{ItemId, PermissionType::*};
use canopy_perms::{PermissionChange, PermissionChangeSet, SkipReason};
use canopy_testkit::{init_tracing, item_id, user, TestFixture};

const BOB: u8 = 2;
const CAROL: u8 = 3;
const DAVE: u8 = 4;

/// 1
/// ├── 2
/// │   ├── 4 (resource)
/// │   └── 5 (owned by dave)
/// │       └── 6 (resource, mine)
/// ├── 3
/// └── 7 (resource)
fn hierarchy(fx: &TestFixture) -> Result<()> {
    let me = fx.me;
    fx.folder(item_id(1), None, &[(me, Owner)])?;
    fx.folder(item_id(2), Some(item_id(1)), &[(me, Owner)])?;
    fx.folder(item_id(3), Some(item_id(1)), &[(me, Owner)])?;
    fx.resource(item_id(4), Some(item_id(2)), &[(me, Owner)])?;
    fx.folder(
        item_id(5),
        Some(item_id(2)),
        &[(user(DAVE), Owner), (me, Read)],
    )?;
    fx.resource(item_id(6), Some(item_id(5)), &[(me, Owner)])?;
    fx.resource(item_id(7), Some(item_id(1)), &[(me, Owner)])?;
    Ok(())
}

#[tokio::test]
async fn share_skips_folders_the_user_does_not_own_but_not_what_they_hold() -> Result<()> {
    init_tracing();
    let fx = TestFixture::new();
    hierarchy(&fx)?;

    let share = fx.share_cascade(CascadeConfig::default())?;
    let report = share
        .run(&fx.share_request(item_id(1), fx.grant(item_id(1), user(BOB), Read)))
        .await?;

    for n in [1, 2, 3, 4, 6, 7] {
        assert_eq!(fx.access(&item_id(n), &user(BOB)), Some(Read), "item {n}");
    }
    // Dave's folder is not ours to share; our resource inside it is.
    assert_eq!(fx.access(&item_id(5), &user(BOB)), None);

    let mut written = report.folders_written.clone();
    written.sort();
    assert_eq!(written, vec![item_id(1), item_id(2), item_id(3)]);
    assert_eq!(report.resources_written.len(), 3);
    Ok(())
}

#[tokio::test]
async fn share_reaches_owned_items_below_a_foreign_folder() -> Result<()> {
    let fx = TestFixture::new();
    let me = fx.me;
    let dave = user(DAVE);
    fx.folder(item_id(1), None, &[(me, Owner)])?;
    fx.folder(item_id(5), Some(item_id(1)), &[(dave, Owner), (me, Read)])?;
    fx.folder(item_id(8), Some(item_id(5)), &[(me, Owner)])?;
    fx.resource(item_id(9), Some(item_id(8)), &[(me, Owner)])?;
    fx.resource(item_id(6), Some(item_id(5)), &[(me, Owner)])?;

    let report = fx
        .share_cascade(CascadeConfig::default())?
        .run(&fx.share_request(item_id(1), fx.grant(item_id(1), user(BOB), Read)))
        .await?;

    assert_eq!(fx.access(&item_id(5), &user(BOB)), None);
    for n in [1, 8, 9, 6] {
        assert_eq!(fx.access(&item_id(n), &user(BOB)), Some(Read), "item {n}");
    }
    assert_eq!(report.folders_written, vec![item_id(1), item_id(8)]);
    assert_eq!(report.resources_written, vec![item_id(9), item_id(6)]);
    Ok(())
}

#[tokio::test]
async fn share_updates_only_items_matching_the_reference() -> Result<()> {
    let fx = TestFixture::new();
    let me = fx.me;
    fx.folder(item_id(1), None, &[(me, Owner), (user(BOB), Read)])?;
    fx.folder(item_id(2), Some(item_id(1)), &[(me, Owner), (user(BOB), Read)])?;
    fx.folder(item_id(3), Some(item_id(1)), &[(me, Owner), (user(BOB), Owner)])?;
    fx.resource(item_id(4), Some(item_id(1)), &[(me, Owner)])?;

    let target = fx
        .backend
        .permissions_of(&item_id(1))
        .ok_or_else(|| anyhow::anyhow!("missing target"))?;
    let bob = target
        .get(&user(BOB))
        .ok_or_else(|| anyhow::anyhow!("missing grant"))?;
    let changes: PermissionChangeSet = vec![PermissionChange::update(bob, Update)].into();

    let report = fx
        .share_cascade(CascadeConfig::default())?
        .run(&fx.share_request(item_id(1), changes))
        .await?;

    assert_eq!(fx.access(&item_id(1), &user(BOB)), Some(Update));
    assert_eq!(fx.access(&item_id(2), &user(BOB)), Some(Update));
    // Diverged: raised to owner by someone else.
    assert_eq!(fx.access(&item_id(3), &user(BOB)), Some(Owner));
    // Never granted: nothing to update.
    assert_eq!(fx.access(&item_id(4), &user(BOB)), None);

    let mut reasons: Vec<(ItemId, SkipReason)> =
        report.skipped.iter().map(|s| (s.item, s.reason)).collect();
    reasons.sort_by_key(|(item, _)| *item);
    assert_eq!(
        reasons,
        vec![
            (item_id(3), SkipReason::Diverged),
            (item_id(4), SkipReason::NotGranted),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn share_revokes_only_unchanged_grants() -> Result<()> {
    let fx = TestFixture::new();
    let me = fx.me;
    fx.folder(item_id(1), None, &[(me, Owner), (user(CAROL), Read)])?;
    fx.folder(item_id(2), Some(item_id(1)), &[(me, Owner), (user(CAROL), Read)])?;
    fx.folder(item_id(3), Some(item_id(1)), &[(me, Owner), (user(CAROL), Update)])?;

    let target = fx
        .backend
        .permissions_of(&item_id(1))
        .ok_or_else(|| anyhow::anyhow!("missing target"))?;
    let carol = target
        .get(&user(CAROL))
        .ok_or_else(|| anyhow::anyhow!("missing grant"))?;
    let changes: PermissionChangeSet = vec![PermissionChange::delete(carol)].into();

    let report = fx
        .share_cascade(CascadeConfig::default())?
        .run(&fx.share_request(item_id(1), changes))
        .await?;

    assert_eq!(fx.access(&item_id(1), &user(CAROL)), None);
    assert_eq!(fx.access(&item_id(2), &user(CAROL)), None);
    assert_eq!(fx.access(&item_id(3), &user(CAROL)), Some(Update));
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, SkipReason::AccessChanged);

    // Folder 2 went back to a single owner.
    let folder = fx
        .backend
        .item(&item_id(2))
        .ok_or_else(|| anyhow::anyhow!("missing folder"))?;
    assert!(folder.personal);
    Ok(())
}

/// Counts folder writes in flight.
struct GaugedWriter {
    inner: Arc<MemoryBackend>,
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl PermissionWriteApi for GaugedWriter {
    async fn write_folder_permissions(
        &self,
        folder_id: &ItemId,
        changes: &PermissionChangeSet,
    ) -> canopy::store::Result<()> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        let result = self.inner.write_folder_permissions(folder_id, changes).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn write_resource_permissions(
        &self,
        resource_ids: &[ItemId],
        changes: &PermissionChangeSet,
        key: &WorkingKey,
    ) -> canopy::store::Result<()> {
        self.inner
            .write_resource_permissions(resource_ids, changes, key)
            .await
    }
}

#[tokio::test]
async fn share_folder_writes_respect_concurrency() -> Result<()> {
    let fx = TestFixture::new();
    let me = fx.me;
    fx.folder(item_id(1), None, &[(me, Owner)])?;
    for n in 2..30 {
        fx.folder(item_id(n), Some(item_id(1)), &[(me, Owner)])?;
    }

    let writer = Arc::new(GaugedWriter {
        inner: fx.backend.clone(),
        current: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let config = CascadeConfig {
        write_concurrency: 3,
        ..CascadeConfig::default()
    };
    let share = ShareCascade::new(fx.backend.clone(), writer.clone(), config)?;

    let report = share
        .run(&fx.share_request(item_id(1), fx.grant(item_id(1), user(BOB), Read)))
        .await?;

    assert_eq!(report.folders_written.len(), 29);
    assert_eq!(writer.peak.load(Ordering::SeqCst), 3);
    for n in 1..30 {
        assert_eq!(fx.access(&item_id(n), &user(BOB)), Some(Read));
    }
    Ok(())
}

#[tokio::test]
async fn share_through_cache_coordinator() -> Result<()> {
    let fx = TestFixture::new();
    hierarchy(&fx)?;

    let config = CascadeConfig {
        cache_max_age_ms: 60_000,
        ..CascadeConfig::default()
    };
    let provider = config.cached(fx.backend.clone());
    let share = ShareCascade::new(provider, fx.backend.clone(), config)?;

    let plan = share
        .plan(&item_id(1), &fx.grant(item_id(1), user(BOB), Read))
        .await?;
    assert_eq!(plan.writes.change_count(), 6);

    share
        .run(&fx.share_request(item_id(1), fx.grant(item_id(1), user(BOB), Read)))
        .await?;

    // The second read of the forest came from the snapshot.
    let reads = fx
        .backend
        .calls()
        .iter()
        .filter(|c| matches!(c, canopy::store::BackendCall::GetAll))
        .count();
    assert_eq!(reads, 1);
    assert_eq!(share.provider().generation(), 1);
    Ok(())
}

#[tokio::test]
async fn share_without_refresh() -> Result<()> {
    let fx = TestFixture::new();
    hierarchy(&fx)?;

    let config = CascadeConfig {
        refresh_after_write: false,
        ..CascadeConfig::default()
    };
    let report = fx
        .share_cascade(config)?
        .run(&fx.share_request(item_id(3), fx.grant(item_id(3), user(BOB), Update)))
        .await?;

    assert!(!report.refreshed);
    assert_eq!(fx.backend.refreshes(), 0);
    assert_eq!(report.folders_written, vec![item_id(3)]);
    Ok(())
}

#[tokio::test]
async fn share_offline_backend_is_retryable() -> Result<()> {
    let fx = TestFixture::new();
    hierarchy(&fx)?;
    fx.backend.set_offline(true);

    let err = fx
        .share_cascade(CascadeConfig::default())?
        .run(&fx.share_request(item_id(1), fx.grant(item_id(1), user(BOB), Read)))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    Ok(())
}
