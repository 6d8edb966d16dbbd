//! Poll scheduler: drives the periodic cycles for one refresh task.
//!
//! Each tick consults the interaction gate first; a busy gate skips the tick
//! without any network call. Cycles run as detached spawns, so `stop()`
//! aborts the timer loop but never an in-flight fetch; the task's generation
//! counter keeps a late completion from committing stale data.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::gate::InteractionGate;
use super::task::RefreshTask;

pub struct PollScheduler {
    handle: Option<JoinHandle<()>>,
}

impl PollScheduler {
    /// Begin the periodic cycle for `task`, consulting `gate` on every tick.
    pub fn start(task: Arc<RefreshTask>, gate: Arc<InteractionGate>) -> Self {
        let spec = task.spec();
        let handle = tokio::spawn(async move {
            let mut tick = interval(spec.interval);
            // A slow cycle must not cause a burst of catch-up ticks
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            if !spec.immediate {
                // interval() yields its first tick immediately; swallow it
                tick.tick().await;
            }

            loop {
                tick.tick().await;

                if gate.is_busy() {
                    debug!(task = %task.id(), "gate busy, tick skipped");
                    continue;
                }

                let task = Arc::clone(&task);
                tokio::spawn(async move {
                    match task.poll_cycle().await {
                        // Failure is already reflected in the connection
                        // status; the next tick retries at the normal
                        // interval.
                        Some(Err(e)) => {
                            warn!(task = %task.id(), error = %e, "scheduled refresh failed")
                        }
                        Some(Ok(())) | None => {}
                    }
                });
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    /// Clear the timer and mark the task inert. Idempotent; in-flight cycles
    /// are left to finish detached.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskId;
    use crate::sync::status::ConnectionTracker;
    use crate::sync::task::{Generation, ScheduleSpec};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_task(interval: Duration, calls: Arc<AtomicUsize>) -> Arc<RefreshTask> {
        let generation = Generation::default();
        let gen_for_fetch = generation.clone();
        Arc::new(RefreshTask::new(
            TaskId::Summary,
            ScheduleSpec {
                interval,
                immediate: true,
            },
            generation,
            Arc::new(ConnectionTracker::new()),
            Arc::new(move |issued| {
                let calls = Arc::clone(&calls);
                let generation = gen_for_fetch.clone();
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    debug_assert!(generation.is_current(issued));
                    Ok(())
                })
            }),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_fire_at_the_configured_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let task = counting_task(Duration::from_secs(30), Arc::clone(&calls));
        let gate = Arc::new(InteractionGate::new(Duration::from_secs(30)));

        let mut scheduler = PollScheduler::start(task, gate);
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        // immediate first cycle
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let task = counting_task(Duration::from_secs(30), Arc::clone(&calls));
        let gate = Arc::new(InteractionGate::new(Duration::from_secs(30)));

        let mut scheduler = PollScheduler::start(task, gate);
        assert!(scheduler.is_running());

        scheduler.stop();
        scheduler.stop();
        assert!(!scheduler.is_running());

        let before = calls.load(Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(300)).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), before);
    }
}
