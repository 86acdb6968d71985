//! Error types for Canopy Core.

use thiserror::Error;

use crate::permission::{AcoKind, Principal};
use crate::types::ItemId;

/// Malformed input, rejected before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("malformed id: {0:?}")]
    MalformedId(String),

    #[error("unknown permission type code: {0}")]
    UnknownPermissionType(u8),

    #[error("unknown item: {0}")]
    UnknownItem(ItemId),

    #[error("permission for {found} does not belong to {expected}")]
    ForeignPermission { expected: ItemId, found: ItemId },

    #[error("permission targets a {found:?}, expected a {expected:?}")]
    AcoMismatch { expected: AcoKind, found: AcoKind },

    #[error("principal {0} appears more than once")]
    DuplicatePrincipal(Principal),

    #[error("item {0} would be left without an owner")]
    NoOwnerRemaining(ItemId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A well-formed request that is illegal against the current item forest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("cannot move {0} into itself")]
    MoveIntoSelf(ItemId),

    #[error("cannot move {item} into its own descendant {destination}")]
    MoveIntoDescendant { item: ItemId, destination: ItemId },

    #[error("destination {0} is not a folder")]
    DestinationNotFolder(ItemId),

    #[error("{0} is already in the requested location")]
    AlreadyInDestination(ItemId),

    #[error("item {0} is not owned by the current user")]
    NotOwner(ItemId),
}

/// Either half of the rejection taxonomy for structural checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveCheckError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}
