//! # Canopy Testkit
//!
//! Testing utilities for Canopy.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Scenarios**: Worked cases with the exact change sets they must produce
//! - **Generators**: Proptest strategies for permission snapshots
//! - **Fixtures**: A memory backend seeded from grant lists, plus cascade and
//!   prompt helpers
//!
//! ## Scenarios
//!
//! ```rust
//! use canopy_perms::PermissionChangeSet;
//! use canopy_testkit::scenarios::access_upgrade;
//!
//! let scenario = access_upgrade().unwrap();
//! let changes = PermissionChangeSet::compute(&scenario.original, &scenario.expected).unwrap();
//! assert_eq!(changes, scenario.changes);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use canopy_core::AcoKind;
//! use canopy_testkit::{fixtures::item_id, generators::snapshot_pair};
//!
//! proptest! {
//!     #[test]
//!     fn diff_reaches_expected((a, b) in snapshot_pair(AcoKind::Folder, item_id(1), 4, 6)) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use canopy_core::PermissionType;
//! use canopy_testkit::fixtures::{item_id, user, TestFixture};
//!
//! let fixture = TestFixture::new();
//! let root = fixture
//!     .folder(item_id(1), None, &[(fixture.me, PermissionType::Owner)])
//!     .unwrap();
//! assert_eq!(fixture.access(&root, &user(1)), Some(PermissionType::Owner));
//! ```

pub mod fixtures;
pub mod generators;
pub mod scenarios;

pub use fixtures::{group, init_tracing, item_id, permission_set, user, RecordingPrompt, TestFixture};
pub use scenarios::{ComputeScenario, MoveScenario, ReplayScenario};
