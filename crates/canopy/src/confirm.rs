//! Move confirmation.

use async_trait::async_trait;
use canopy_core::ItemId;

/// The caller's answer to a move that would change permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveDecision {
    /// `true` applies the computed changes; `false` keeps current
    /// permissions and discards them all.
    pub apply: bool,
}

impl MoveDecision {
    pub const APPLY: MoveDecision = MoveDecision { apply: true };
    pub const KEEP: MoveDecision = MoveDecision { apply: false };
}

/// Asked once per move, only when the move would change permissions.
///
/// Contexts are the old and new parent ids; `None` is the root.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn confirm(&self, old_context: Option<ItemId>, new_context: Option<ItemId>)
        -> MoveDecision;
}

/// Always applies the computed changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysApply;

/// Always keeps current permissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysKeep;

#[async_trait]
impl ConfirmationPrompt for AlwaysApply {
    async fn confirm(&self, _old: Option<ItemId>, _new: Option<ItemId>) -> MoveDecision {
        MoveDecision::APPLY
    }
}

#[async_trait]
impl ConfirmationPrompt for AlwaysKeep {
    async fn confirm(&self, _old: Option<ItemId>, _new: Option<ItemId>) -> MoveDecision {
        MoveDecision::KEEP
    }
}

#[async_trait]
impl<T: ConfirmationPrompt + ?Sized> ConfirmationPrompt for std::sync::Arc<T> {
    async fn confirm(&self, old: Option<ItemId>, new: Option<ItemId>) -> MoveDecision {
        (**self).confirm(old, new).await
    }
}
