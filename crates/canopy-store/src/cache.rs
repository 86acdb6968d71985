//! Per-account cache coordinator.
//!
//! [`TreeCache`] decorates an [`ItemTreeProvider`] with the bookkeeping a
//! shared item-tree cache needs: a snapshot with a freshness window, the time
//! of the last refresh, and single-flight refreshes. All of it lives on the
//! instance; create one per account.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use canopy_core::{Item, ItemId, PermissionSet};

use crate::error::Result;
use crate::traits::ItemTreeProvider;

#[derive(Default)]
struct CacheState {
    /// Last item list read from the provider.
    items: Option<Vec<Item>>,
    /// When `items` was read.
    fetched_at: Option<Instant>,
    /// When the last refresh completed.
    last_refresh: Option<Instant>,
}

/// Item-tree cache coordinator for one account.
pub struct TreeCache<P: ItemTreeProvider> {
    provider: P,
    max_age: Duration,
    state: Mutex<CacheState>,
    /// Held for the duration of a provider refresh.
    refresh_lock: tokio::sync::Mutex<()>,
    /// Completed refreshes. Callers compare before and after queueing.
    generation: AtomicU64,
}

impl<P: ItemTreeProvider> TreeCache<P> {
    /// Wrap `provider`. `max_age` of zero disables snapshot reuse.
    pub fn new(provider: P, max_age: Duration) -> Self {
        Self {
            provider,
            max_age,
            state: Mutex::new(CacheState::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// The wrapped provider.
    pub fn inner(&self) -> &P {
        &self.provider
    }

    /// When the last refresh completed, if any.
    pub fn last_refresh(&self) -> Option<Instant> {
        self.state().last_refresh
    }

    /// Number of refreshes actually forwarded to the provider.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Drop the cached snapshot so the next read goes to the provider.
    pub fn invalidate(&self) {
        let mut state = self.state();
        state.items = None;
        state.fetched_at = None;
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fresh_items(&self) -> Option<Vec<Item>> {
        if self.max_age.is_zero() {
            return None;
        }
        let state = self.state();
        match (&state.items, state.fetched_at) {
            (Some(items), Some(at)) if at.elapsed() < self.max_age => Some(items.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl<P: ItemTreeProvider> ItemTreeProvider for TreeCache<P> {
    async fn get_all(&self) -> Result<Vec<Item>> {
        if let Some(items) = self.fresh_items() {
            return Ok(items);
        }

        let items = self.provider.get_all().await?;
        let mut state = self.state();
        state.items = Some(items.clone());
        state.fetched_at = Some(Instant::now());
        Ok(items)
    }

    async fn get_permissions(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, PermissionSet>> {
        self.provider.get_permissions(ids).await
    }

    async fn move_item(&self, id: &ItemId, new_parent: Option<ItemId>) -> Result<()> {
        self.provider.move_item(id, new_parent).await?;
        self.invalidate();
        Ok(())
    }

    /// Single-flight refresh: a caller that queued behind a running refresh
    /// returns once it completes instead of refreshing again.
    async fn refresh_cache(&self) -> Result<()> {
        let seen = self.generation.load(Ordering::Acquire);
        let _guard = self.refresh_lock.lock().await;

        if self.generation.load(Ordering::Acquire) != seen {
            tracing::debug!(generation = seen + 1, "refresh coalesced");
            return Ok(());
        }

        self.provider.refresh_cache().await?;

        {
            let mut state = self.state();
            state.items = None;
            state.fetched_at = None;
            state.last_refresh = Some(Instant::now());
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
