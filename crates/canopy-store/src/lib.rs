//! # Canopy Store
//!
//! The external collaborators the cascades talk to, expressed as async traits,
//! plus two implementations:
//!
//! - [`TreeCache`] - A per-account cache coordinator wrapping any
//!   [`ItemTreeProvider`]; coalesces concurrent refreshes and serves a fresh
//!   item snapshot without hitting the remote again
//! - [`MemoryBackend`] - An in-memory provider and writer for tests and
//!   embedding, with a call log and failure injection
//!
//! ## Key Types
//!
//! - [`ItemTreeProvider`] - Item forest, permission snapshots, moves, refresh
//! - [`PermissionWriteApi`] - Folder and resource permission writes
//! - [`WorkingKey`] - Decrypted key material handed through to resource writes
//!
//! ## Design Notes
//!
//! - **No global state**: refresh bookkeeping lives on the [`TreeCache`]
//!   instance, so several accounts can coexist in one process.
//! - **Writes are not transactional**: a bulk resource write may stop partway;
//!   callers rely on idempotent retries instead.

pub mod cache;
pub mod error;
pub mod memory;
pub mod traits;

pub use cache::TreeCache;
pub use error::{Result, StoreError};
pub use memory::{BackendCall, MemoryBackend};
pub use traits::{ItemTreeProvider, PermissionWriteApi, WorkingKey};
