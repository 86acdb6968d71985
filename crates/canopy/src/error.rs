//! Error types for the cascades.

use canopy_core::{MoveCheckError, PreconditionError, ValidationError};
use canopy_perms::PermsError;
use canopy_runner::RunnerError;
use canopy_store::StoreError;
use thiserror::Error;

/// Errors that can occur while planning or running a cascade.
#[derive(Debug, Error)]
pub enum CascadeError {
    /// Malformed input. Raised before any remote effect.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Illegal request against the current item forest. Raised before any
    /// remote effect.
    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// A remote read, write, or move failed. Earlier writes stay in place.
    #[error("remote call failed: {0}")]
    Remote(#[from] StoreError),

    /// A change set could not be built.
    #[error("permission error: {0}")]
    Perms(PermsError),

    /// The task runner failed for a reason other than a task error.
    #[error("task runner error: {0}")]
    Runner(String),
}

impl CascadeError {
    /// Whether re-running the whole cascade may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CascadeError::Remote(_))
    }
}

impl From<PermsError> for CascadeError {
    fn from(err: PermsError) -> Self {
        match err {
            PermsError::Validation(inner) => CascadeError::Validation(inner),
            other => CascadeError::Perms(other),
        }
    }
}

impl From<MoveCheckError> for CascadeError {
    fn from(err: MoveCheckError) -> Self {
        match err {
            MoveCheckError::Validation(inner) => CascadeError::Validation(inner),
            MoveCheckError::Precondition(inner) => CascadeError::Precondition(inner),
        }
    }
}

impl From<RunnerError<StoreError>> for CascadeError {
    fn from(err: RunnerError<StoreError>) -> Self {
        match err {
            RunnerError::Task { source, .. } => CascadeError::Remote(source),
            other => CascadeError::Runner(other.to_string()),
        }
    }
}

/// Result type for cascade operations.
pub type Result<T> = std::result::Result<T, CascadeError>;
