//! # Canopy
//!
//! Permission cascades for a collaborative credential store: propagating a
//! share down a folder hierarchy, and deciding what a move changes.
//!
//! ## Overview
//!
//! - [`ShareCascade`] - Apply a user-authored change set to a target item and
//!   replay it onto every owned descendant, skipping items that diverged
//! - [`MoveCascade`] - Re-parent an item, swapping permissions inherited from
//!   the old parent for those of the new one after the caller confirms
//!
//! Both cascades read the item forest and permission snapshots through an
//! [`ItemTreeProvider`](store::ItemTreeProvider), write through a
//! [`PermissionWriteApi`](store::PermissionWriteApi), and fan per-folder
//! writes out through a bounded [`TaskRunner`](runner::TaskRunner).
//!
//! ## Failure Model
//!
//! Validation and precondition failures are raised before any remote effect.
//! A remote failure aborts the current phase and leaves completed writes in
//! place; [`CascadeError::is_retryable`] tells the caller a re-run is safe.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use canopy::{AlwaysApply, CascadeConfig, MoveCascade, MoveRequest};
//! use canopy::core::ItemId;
//! use canopy::store::{MemoryBackend, WorkingKey};
//!
//! async fn example(item: ItemId, destination: ItemId) -> canopy::Result<()> {
//!     let backend = Arc::new(MemoryBackend::new());
//!     let config = CascadeConfig::default();
//!     let provider = config.cached(backend.clone());
//!
//!     let cascade = MoveCascade::new(provider, backend, AlwaysApply, config)?;
//!     let report = cascade
//!         .run(&MoveRequest {
//!             item,
//!             destination: Some(destination),
//!             key: WorkingKey::new(b"decrypted".to_vec()),
//!         })
//!         .await?;
//!
//!     println!("{} permission changes applied", report.changes_applied);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod confirm;
pub mod error;
pub mod moves;
pub mod scope;
pub mod share;
pub mod writes;

// Re-export component crates
pub use canopy_core as core;
pub use canopy_perms as perms;
pub use canopy_runner as runner;
pub use canopy_store as store;

pub use config::CascadeConfig;
pub use confirm::{AlwaysApply, AlwaysKeep, ConfirmationPrompt, MoveDecision};
pub use error::{CascadeError, Result};
pub use moves::{move_diff, MoveCascade, MovePlan, MoveReport, MoveRequest};
pub use scope::Scope;
pub use share::{ShareCascade, SharePlan, ShareReport, ShareRequest};
pub use writes::PlannedWrites;
