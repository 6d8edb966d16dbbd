//! Refresh task: one named periodic fetch-and-commit cycle.
//!
//! Owns the overlap lock and the generation counter. The generation counter
//! is the ordering guard: a request issued at generation `g` may only commit
//! while `g` is still the latest issued generation, so a slow response can
//! never overwrite a snapshot already updated by a faster, newer one.

use futures::future::BoxFuture;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use super::status::ConnectionTracker;
use crate::domain::TaskId;
use crate::error::{Result, SyncError};

/// Configuration for one named periodic task
#[derive(Debug, Clone, Copy)]
pub struct ScheduleSpec {
    pub interval: Duration,
    /// Run one cycle up front instead of waiting for the first interval
    pub immediate: bool,
}

/// The fetch-and-commit body of a task. Receives the generation it was issued
/// under; the body must commit through [`Generation::commit_if_current`] and
/// resolve with `StaleResponseDiscarded` when that returns `None`.
pub type FetchFn = Arc<dyn Fn(u64) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Shared per-task request tag. Cloned into the fetch body so the commit path
/// can verify it still belongs to the most recently issued request.
///
/// The counter lives under a mutex rather than an atomic: issuing a new
/// generation and committing an older one must be mutually exclusive, or a
/// response could pass the currency check on one worker thread and then land
/// its commit after a newer request has already committed.
#[derive(Clone, Default)]
pub struct Generation(Arc<StdMutex<u64>>);

impl Generation {
    /// Tag a new request and make it the latest issued one. Blocks while a
    /// commit for an earlier generation is in progress.
    pub fn issue(&self) -> u64 {
        let mut latest = self.0.lock().expect("generation lock poisoned");
        *latest += 1;
        *latest
    }

    /// Whether `generation` is still the latest issued request
    pub fn is_current(&self, generation: u64) -> bool {
        *self.0.lock().expect("generation lock poisoned") == generation
    }

    /// Run `commit` only if `issued` is still the latest issued request,
    /// holding the counter lock across the check and the commit so no newer
    /// request can be issued in between. Returns `None` when `issued` has
    /// been superseded and the commit never ran.
    pub fn commit_if_current<R>(&self, issued: u64, commit: impl FnOnce() -> R) -> Option<R> {
        let latest = self.0.lock().expect("generation lock poisoned");
        (*latest == issued).then(commit)
    }
}

pub struct RefreshTask {
    id: TaskId,
    spec: ScheduleSpec,
    generation: Generation,
    /// Held for the duration of a scheduled cycle; `try_lock` failure is the
    /// in-flight dedup signal
    run_lock: Mutex<()>,
    fetch: FetchFn,
    tracker: Arc<ConnectionTracker>,
}

impl RefreshTask {
    pub fn new(
        id: TaskId,
        spec: ScheduleSpec,
        generation: Generation,
        tracker: Arc<ConnectionTracker>,
        fetch: FetchFn,
    ) -> Self {
        Self {
            id,
            spec,
            generation,
            run_lock: Mutex::new(()),
            fetch,
            tracker,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn spec(&self) -> ScheduleSpec {
        self.spec
    }

    /// One scheduled cycle. Returns `None` when a cycle for this task is
    /// already in flight (no overlapping calls for the same task).
    pub async fn poll_cycle(&self) -> Option<Result<()>> {
        let Ok(_permit) = self.run_lock.try_lock() else {
            debug!(task = %self.id, "cycle already in flight, tick skipped");
            return None;
        };
        Some(self.execute().await)
    }

    /// One forced cycle (manual refresh). Bypasses in-flight dedup: if a
    /// cycle is running, this one is issued concurrently and the generation
    /// counter guarantees only the newest response commits.
    pub async fn forced_cycle(&self) -> Result<()> {
        match self.run_lock.try_lock() {
            Ok(_permit) => self.execute().await,
            Err(_) => self.execute().await,
        }
    }

    async fn execute(&self) -> Result<()> {
        let generation = self.generation.issue();
        self.tracker.on_attempt_start();

        match (self.fetch)(generation).await {
            Ok(()) => {
                if self.generation.is_current(generation) {
                    self.tracker.on_attempt_success();
                }
                Ok(())
            }
            Err(SyncError::StaleResponseDiscarded) => {
                // Ordering artifact, not a failure; the newer request owns
                // the connection status.
                debug!(task = %self.id, generation, "stale response discarded");
                Ok(())
            }
            Err(e) => {
                if self.generation.is_current(generation) {
                    self.tracker.on_attempt_failure(e.to_string());
                }
                Err(e)
            }
        }
    }
}
