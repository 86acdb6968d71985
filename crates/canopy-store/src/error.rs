//! Error types for the store module.

use thiserror::Error;

use canopy_core::ItemId;
use canopy_perms::PermsError;

/// Errors raised by remote collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The remote refused a permission write.
    #[error("write rejected for {item}: {reason}")]
    WriteRejected { item: ItemId, reason: String },

    /// The remote refused a move.
    #[error("move rejected for {item}: {reason}")]
    MoveRejected { item: ItemId, reason: String },

    /// A snapshot was requested but not returned.
    #[error("missing permissions for {0}")]
    MissingPermissions(ItemId),

    /// The remote does not know the item.
    #[error("unknown item: {0}")]
    UnknownItem(ItemId),

    /// Resource writes need decrypted key material.
    #[error("resource write requires a working key")]
    KeyRequired,

    /// Transport or availability failure.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// A change set did not apply to the stored snapshot.
    #[error("permission error: {0}")]
    Perms(#[from] PermsError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
