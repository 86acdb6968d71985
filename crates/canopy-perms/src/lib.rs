//! # Canopy Permissions
//!
//! Permission change sets and the algorithms that produce them.
//!
//! ## Overview
//!
//! A [`PermissionChangeSet`] is an ordered list of [`PermissionChange`]s,
//! possibly spanning several items. Change sets are transient: they are built
//! per operation from freshly fetched snapshots and handed to a writer.
//!
//! ## Key Operations
//!
//! - [`PermissionChangeSet::compute`] - Minimal diff between two snapshots of
//!   one item, matched by principal
//! - [`replay`] - Decide which entries of a template computed for a reference
//!   item still apply to another item's current snapshot
//! - [`PermissionChangeSet::retarget`] / [`PermissionChangeSet::merge`] -
//!   Re-address and combine sets
//! - [`apply`] - Strictly apply a set to a snapshot
//!
//! ## Conflict Model
//!
//! Replay is optimistic concurrency per (item, principal) pair: a change whose
//! precondition no longer holds against the current snapshot is dropped and
//! reported as [`ConflictSkipped`], never forced through.
//!
//! ```rust
//! use canopy_core::{AcoKind, ItemId, PermissionSet, PermissionType, Principal, PrincipalId};
//! use canopy_perms::{apply, PermissionChangeSet};
//!
//! let folder = ItemId::random();
//! let alice = Principal::user(PrincipalId::random());
//! let bob = Principal::user(PrincipalId::random());
//!
//! let original = PermissionSet::new(AcoKind::Folder, folder)
//!     .grant(alice, PermissionType::Owner).unwrap();
//! let expected = original.clone().grant(bob, PermissionType::Read).unwrap();
//!
//! let changes = PermissionChangeSet::compute(&original, &expected).unwrap();
//! assert_eq!(changes.len(), 1);
//! assert!(apply(&original, &changes).unwrap().same_grants(&expected));
//! ```

pub mod apply;
pub mod change;
pub mod changeset;
pub mod error;
pub mod replay;

pub use apply::{apply, validate_authored};
pub use change::{ChangeScenario, PermissionChange};
pub use changeset::PermissionChangeSet;
pub use error::{PermsError, Result};
pub use replay::{replay, replay_detailed, ConflictSkipped, Replay, SkipReason};
