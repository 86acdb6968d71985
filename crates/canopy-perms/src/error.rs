//! Error types for the permissions module.

use thiserror::Error;

use canopy_core::{ItemId, Principal, ValidationError};

/// Errors that can occur while building or applying change sets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermsError {
    /// Two snapshots that must describe one item describe different items.
    #[error("snapshot mismatch: expected {expected}, got {found}")]
    SnapshotMismatch { expected: ItemId, found: ItemId },

    /// A change cannot be applied to the snapshot it targets.
    #[error("change rejected for {principal} on {item}: {reason}")]
    ChangeRejected {
        item: ItemId,
        principal: Principal,
        reason: &'static str,
    },

    /// Malformed input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
