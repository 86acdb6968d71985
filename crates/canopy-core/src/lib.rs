//! # Canopy Core
//!
//! Pure primitives for Canopy: identifiers, permissions, and items.
//!
//! This crate contains no I/O and no async code. It describes authorization
//! snapshots and the folder/resource forest they apply to.
//!
//! ## Key Types
//!
//! - [`ItemId`], [`PrincipalId`], [`PermissionId`] - UUID-shaped identifiers
//! - [`Permission`] - One grant of an access level to a principal on an item
//! - [`PermissionSet`] - The permissions of one item (a read-only snapshot)
//! - [`Item`] / [`ItemTree`] - Folders and resources arranged as a forest
//!
//! ## Errors
//!
//! [`ValidationError`] covers malformed ids and shapes. [`PreconditionError`]
//! covers structurally illegal operations such as moving a folder into its own
//! descendant. Both are raised before any mutation happens.

pub mod error;
pub mod item;
pub mod permission;
pub mod types;
pub mod validation;

pub use error::{MoveCheckError, PreconditionError, ValidationError};
pub use item::{Item, ItemTree};
pub use permission::{AcoKind, AroKind, Permission, PermissionSet, PermissionType, Principal};
pub use types::{ItemId, PermissionId, PrincipalId};
pub use validation::{validate_move_target, validate_permission_set};
