//! # Canopy Runner
//!
//! Runs independent operations (one remote call per item) with a fixed
//! maximum in flight.
//!
//! ## Key Properties
//!
//! - **Bounded**: never more than `concurrency` tasks outstanding
//! - **Ordered results**: result `i` belongs to task `i`, whatever the
//!   completion order
//! - **Exclusive claims**: each task index is claimed by exactly one worker
//!   inside a critical section
//! - **Run once**: a second run of the same instance is rejected
//!
//! ## Scheduling
//!
//! Workers are cooperative futures polled on the caller's task; "concurrent"
//! means up to `concurrency` operations issued before any is awaited to
//! completion. Nothing is spawned, so tasks may borrow from the caller.
//!
//! ```rust
//! use canopy_runner::TaskRunner;
//!
//! # futures::executor::block_on(async {
//! let tasks: Vec<_> = (0..10u32)
//!     .map(|n| move || async move { Ok::<_, std::io::Error>(n * 2) })
//!     .collect();
//!
//! let runner = TaskRunner::new(tasks, 3).unwrap();
//! let doubled = runner.run().await.unwrap();
//! assert_eq!(doubled[4], 8);
//! # });
//! ```

pub mod error;
pub mod runner;

pub use error::RunnerError;
pub use runner::{RunOptions, TaskRunner};
