//! Error types for the task runner.

use thiserror::Error;

/// Errors from a runner, generic over the task error type.
#[derive(Debug, Error)]
pub enum RunnerError<E> {
    /// A runner needs at least one worker.
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    /// The instance was already run.
    #[error("task runner has already been run")]
    AlreadyRun,

    /// The first task failure, when errors are not ignored.
    #[error("task {index} failed: {source}")]
    Task {
        index: usize,
        #[source]
        source: E,
    },

    /// A slot was left empty without a recorded failure.
    #[error("task {0} produced no result")]
    Incomplete(usize),
}
