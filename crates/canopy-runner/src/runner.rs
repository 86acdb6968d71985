//! The bounded-concurrency task runner.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use crate::error::RunnerError;

/// How a run treats task failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// When false, the first failure halts further claims and fails the run.
    /// When true, a failing task's slot holds its error and the run completes.
    pub ignore_errors: bool,
}

#[derive(Debug, Default)]
struct ClaimState {
    /// Next unclaimed index.
    next: usize,
    /// Set on the first failure when errors are not ignored.
    halted: bool,
    /// Set when a run starts; instances run once.
    started: bool,
}

/// Runs task factories with at most `concurrency` in flight.
///
/// Each task is a closure producing a future, so nothing starts until a
/// worker claims its index.
pub struct TaskRunner<F> {
    tasks: Mutex<Vec<Option<F>>>,
    concurrency: usize,
    claims: Mutex<ClaimState>,
}

/// Per-run scratch shared by the workers.
struct RunState<T, E> {
    slots: Mutex<Vec<Option<Result<T, E>>>>,
    first_error: Mutex<Option<(usize, E)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<F, Fut, T, E> TaskRunner<F>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    /// Create a runner over `tasks`.
    pub fn new(tasks: Vec<F>, concurrency: usize) -> Result<Self, RunnerError<E>> {
        if concurrency == 0 {
            return Err(RunnerError::ZeroConcurrency);
        }
        Ok(Self {
            tasks: Mutex::new(tasks.into_iter().map(Some).collect()),
            concurrency,
            claims: Mutex::new(ClaimState::default()),
        })
    }

    pub fn len(&self) -> usize {
        lock(&self.tasks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run, halting on the first failure. Results are index-aligned with the
    /// tasks.
    pub async fn run(&self) -> Result<Vec<T>, RunnerError<E>> {
        let results = self.run_with(RunOptions::default()).await?;
        results
            .into_iter()
            .enumerate()
            .map(|(index, r)| r.map_err(|source| RunnerError::Task { index, source }))
            .collect()
    }

    /// Run every task to completion, keeping failures in their slots.
    pub async fn run_settled(&self) -> Result<Vec<Result<T, E>>, RunnerError<E>> {
        self.run_with(RunOptions {
            ignore_errors: true,
        })
        .await
    }

    /// Run with explicit options.
    ///
    /// With `ignore_errors` false, the first failure stops new claims;
    /// in-flight tasks finish but their results are discarded and the
    /// failure is returned.
    pub async fn run_with(
        &self,
        options: RunOptions,
    ) -> Result<Vec<Result<T, E>>, RunnerError<E>> {
        {
            let mut claims = lock(&self.claims);
            if claims.started {
                return Err(RunnerError::AlreadyRun);
            }
            claims.started = true;
        }

        let total = self.len();
        let state = RunState {
            slots: Mutex::new((0..total).map(|_| None).collect()),
            first_error: Mutex::new(None),
        };

        let workers = self.concurrency.min(total);
        tracing::trace!(total, workers, "task run starting");

        futures::future::join_all(
            (0..workers).map(|_| self.worker(options.ignore_errors, &state)),
        )
        .await;

        if let Some((index, source)) = lock(&state.first_error).take() {
            tracing::debug!(index, "task run halted on failure");
            return Err(RunnerError::Task { index, source });
        }

        let slots = std::mem::take(&mut *lock(&state.slots));
        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or(RunnerError::Incomplete(index)))
            .collect()
    }

    /// Claim the next index. This is the critical section every worker
    /// races through.
    fn claim(&self) -> Option<usize> {
        let mut claims = lock(&self.claims);
        if claims.halted || claims.next >= lock(&self.tasks).len() {
            return None;
        }
        let index = claims.next;
        claims.next += 1;
        Some(index)
    }

    fn halt(&self) {
        lock(&self.claims).halted = true;
    }

    async fn worker(&self, ignore_errors: bool, state: &RunState<T, E>) {
        while let Some(index) = self.claim() {
            let Some(task) = lock(&self.tasks)[index].take() else {
                continue;
            };

            match task().await {
                Err(source) if !ignore_errors => {
                    self.halt();
                    let mut first = lock(&state.first_error);
                    if first.is_none() {
                        *first = Some((index, source));
                    }
                }
                outcome => lock(&state.slots)[index] = Some(outcome),
            }
        }
    }
}
