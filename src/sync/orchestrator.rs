//! Refresh orchestrator — public surface of the sync coordinator.
//!
//! Owns the interaction gate, the snapshot stores, the connection tracker,
//! and one refresh task per resource group ("summary" every 30s, "chart"
//! every 120s by default). Periodic scheduling, manual refresh, and
//! post-mutation refresh all funnel through the same tasks, so the
//! generation counter resolves every race the same way: only the response to
//! the most recently issued request for a task ever commits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::gate::{GateGuard, InteractionGate};
use super::scheduler::PollScheduler;
use super::status::{ConnectionTracker, StatusSnapshot};
use super::store::SnapshotStore;
use super::task::{FetchFn, Generation, RefreshTask, ScheduleSpec};
use crate::api::DashboardApi;
use crate::config::RefreshConfig;
use crate::domain::{
    validate_adjust_units, validate_device_id, AdjustUnitsRequest, AssignMeterRequest, ChartPeriod,
    ChartSnapshot, SummarySnapshot, TaskId,
};
use crate::error::{Result, SyncError};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
struct ChartParams {
    period: ChartPeriod,
    meter_filter: String,
}

pub struct RefreshOrchestrator {
    api: Arc<dyn DashboardApi>,
    gate: Arc<InteractionGate>,
    tracker: Arc<ConnectionTracker>,
    summary_store: Arc<SnapshotStore<SummarySnapshot>>,
    chart_store: Arc<SnapshotStore<ChartSnapshot>>,
    chart_params: Arc<StdMutex<ChartParams>>,
    tasks: HashMap<TaskId, Arc<RefreshTask>>,
    /// Present iff auto-refresh is running; dropping a scheduler stops it
    schedulers: StdMutex<Option<Vec<PollScheduler>>>,
}

impl RefreshOrchestrator {
    pub fn new(api: Arc<dyn DashboardApi>, refresh: &RefreshConfig) -> Self {
        let gate = Arc::new(InteractionGate::new(refresh.interaction_timeout()));
        let tracker = Arc::new(ConnectionTracker::new());
        let summary_store = Arc::new(SnapshotStore::new());
        let chart_store = Arc::new(SnapshotStore::new());
        let chart_params = Arc::new(StdMutex::new(ChartParams {
            period: ChartPeriod::default(),
            meter_filter: "all".to_string(),
        }));

        let mut tasks = HashMap::new();

        let summary_gen = Generation::default();
        let summary_fetch = Self::summary_fetch_fn(
            Arc::clone(&api),
            Arc::clone(&summary_store),
            summary_gen.clone(),
            refresh.low_units_warn_threshold,
        );
        tasks.insert(
            TaskId::Summary,
            Arc::new(RefreshTask::new(
                TaskId::Summary,
                ScheduleSpec {
                    interval: refresh.summary_interval(),
                    immediate: true,
                },
                summary_gen,
                Arc::clone(&tracker),
                summary_fetch,
            )),
        );

        let chart_gen = Generation::default();
        let chart_fetch = Self::chart_fetch_fn(
            Arc::clone(&api),
            Arc::clone(&chart_store),
            Arc::clone(&chart_params),
            chart_gen.clone(),
        );
        tasks.insert(
            TaskId::Chart,
            Arc::new(RefreshTask::new(
                TaskId::Chart,
                ScheduleSpec {
                    interval: refresh.chart_interval(),
                    immediate: true,
                },
                chart_gen,
                Arc::clone(&tracker),
                chart_fetch,
            )),
        );

        Self {
            api,
            gate,
            tracker,
            summary_store,
            chart_store,
            chart_params,
            tasks,
            schedulers: StdMutex::new(None),
        }
    }

    fn summary_fetch_fn(
        api: Arc<dyn DashboardApi>,
        store: Arc<SnapshotStore<SummarySnapshot>>,
        generation: Generation,
        low_units_warn_threshold: usize,
    ) -> FetchFn {
        Arc::new(move |issued| {
            let api = Arc::clone(&api);
            let store = Arc::clone(&store);
            let generation = generation.clone();
            Box::pin(async move {
                let payload = api.fetch_summary().await?;

                let low_count = payload.low_units_meters.len();
                if low_count > low_units_warn_threshold {
                    warn!(count = low_count, "meters with critically low units");
                }

                let changed = generation
                    .commit_if_current(issued, || store.commit(payload))
                    .ok_or(SyncError::StaleResponseDiscarded)?;
                if changed {
                    debug!("summary snapshot updated");
                }
                Ok(())
            })
        })
    }

    fn chart_fetch_fn(
        api: Arc<dyn DashboardApi>,
        store: Arc<SnapshotStore<ChartSnapshot>>,
        params: Arc<StdMutex<ChartParams>>,
        generation: Generation,
    ) -> FetchFn {
        Arc::new(move |issued| {
            let api = Arc::clone(&api);
            let store = Arc::clone(&store);
            let params = Arc::clone(&params);
            let generation = generation.clone();
            Box::pin(async move {
                let (period, meter_filter) = {
                    let p = params.lock().expect("chart params lock poisoned");
                    (p.period, p.meter_filter.clone())
                };
                let points = api.fetch_chart(period, &meter_filter).await?;

                let changed = generation
                    .commit_if_current(issued, || {
                        store.commit(ChartSnapshot {
                            period,
                            meter_filter,
                            points,
                        })
                    })
                    .ok_or(SyncError::StaleResponseDiscarded)?;
                if changed {
                    debug!(%period, "chart snapshot updated");
                }
                Ok(())
            })
        })
    }

    /// Begin all configured periodic tasks. No-op if already started.
    pub fn start(&self) {
        let mut schedulers = self.schedulers.lock().expect("scheduler lock poisoned");
        if schedulers.is_some() {
            return;
        }
        info!(tasks = self.tasks.len(), "auto-refresh started");
        *schedulers = Some(
            self.tasks
                .values()
                .map(|task| PollScheduler::start(Arc::clone(task), Arc::clone(&self.gate)))
                .collect(),
        );
    }

    /// Tear down all periodic tasks. Idempotent; in-flight fetches finish
    /// detached and stay generation-guarded.
    pub fn stop(&self) {
        let mut schedulers = self.schedulers.lock().expect("scheduler lock poisoned");
        if schedulers.take().is_some() {
            info!("auto-refresh stopped");
        }
    }

    /// Flip auto-refresh; returns whether it is now enabled.
    pub fn toggle_auto_refresh(&self) -> bool {
        if self.is_running() {
            self.stop();
            false
        } else {
            self.start();
            true
        }
    }

    pub fn is_running(&self) -> bool {
        self.schedulers
            .lock()
            .expect("scheduler lock poisoned")
            .is_some()
    }

    /// Force one fetch cycle for every task, regardless of gate state and
    /// in-flight dedup. A cycle racing a periodic one is resolved by the
    /// generation counter (only the newest issued request commits). The
    /// first failure is surfaced once so the UI can show a single
    /// notification.
    pub async fn manual_refresh(&self) -> Result<()> {
        let cycles = self.tasks.values().map(|task| task.forced_cycle());
        let results = futures::future::join_all(cycles).await;
        results.into_iter().collect()
    }

    /// Out-of-band refresh of the given tasks after a successful mutation.
    /// Subject to the same gate check as periodic ticks: a user still
    /// interacting with a follow-up form keeps the refresh suspended until
    /// the next scheduled tick.
    pub async fn notify_mutation(&self, affected: &[TaskId]) {
        if self.gate.is_busy() {
            debug!(?affected, "gate busy, post-mutation refresh skipped");
            return;
        }
        for id in affected {
            let Some(task) = self.tasks.get(id) else {
                continue;
            };
            match task.poll_cycle().await {
                Some(Err(e)) => warn!(task = %id, error = %e, "post-mutation refresh failed"),
                Some(Ok(())) | None => {}
            }
        }
    }

    /// Change the chart aggregation window and refetch the series.
    pub async fn set_chart_period(&self, period: ChartPeriod) -> Result<()> {
        {
            let mut params = self.chart_params.lock().expect("chart params lock poisoned");
            if params.period == period {
                return Ok(());
            }
            params.period = period;
        }
        self.refresh_chart().await
    }

    /// Change the chart meter filter ("all" or one device id) and refetch.
    pub async fn set_chart_meter(&self, meter_filter: impl Into<String>) -> Result<()> {
        let meter_filter = meter_filter.into();
        {
            let mut params = self.chart_params.lock().expect("chart params lock poisoned");
            if params.meter_filter == meter_filter {
                return Ok(());
            }
            params.meter_filter = meter_filter;
        }
        self.refresh_chart().await
    }

    async fn refresh_chart(&self) -> Result<()> {
        self.tasks[&TaskId::Chart].forced_cycle().await
    }

    // --- Mutation collaborators -------------------------------------------
    // Each is invoked at most once per user action; no orchestrator-level
    // retry. On success the affected tasks are refreshed through the gated
    // out-of-band path.

    pub async fn assign_meter(
        &self,
        user_id: &str,
        device_id: &str,
        nickname: Option<String>,
    ) -> Result<()> {
        validate_device_id(device_id)?;
        let req = AssignMeterRequest {
            user_id: user_id.to_string(),
            device_id: device_id.trim().to_string(),
            nickname,
        };
        self.api.assign_meter(&req).await?;
        info!(device_id = %req.device_id, user_id = %req.user_id, "meter assigned");
        self.notify_mutation(&[TaskId::Summary]).await;
        Ok(())
    }

    pub async fn create_meter(&self, device_id: &str) -> Result<()> {
        validate_device_id(device_id)?;
        self.api.create_meter(device_id.trim()).await?;
        info!(device_id = device_id.trim(), "meter created");
        self.notify_mutation(&[TaskId::Summary]).await;
        Ok(())
    }

    pub async fn admin_adjust_units(
        &self,
        device_id: &str,
        units: Decimal,
        admin_notes: Option<String>,
    ) -> Result<()> {
        validate_device_id(device_id)?;
        validate_adjust_units(units)?;
        let req = AdjustUnitsRequest {
            device_id: device_id.trim().to_string(),
            units,
            admin_notes,
        };
        self.api.admin_adjust_units(&req).await?;
        info!(device_id = %req.device_id, %units, "admin unit adjustment applied");
        self.notify_mutation(&[TaskId::Summary, TaskId::Chart]).await;
        Ok(())
    }

    // --- Shared-state accessors -------------------------------------------

    /// The shared interaction gate, for UI lifecycle wiring
    pub fn gate(&self) -> Arc<InteractionGate> {
        Arc::clone(&self.gate)
    }

    /// Acquire a suspension reason scoped to the returned guard
    pub fn suspend_while(&self, reason: impl Into<String>) -> GateGuard {
        self.gate.acquire(reason)
    }

    /// Forwarded to the gate's transient interaction flag
    pub fn set_interacting(&self, active: bool) {
        self.gate.set_interacting(active);
    }

    pub fn summary(&self) -> Option<SummarySnapshot> {
        self.summary_store.current()
    }

    pub fn chart(&self) -> Option<ChartSnapshot> {
        self.chart_store.current()
    }

    pub fn subscribe_summary(&self) -> watch::Receiver<Option<SummarySnapshot>> {
        self.summary_store.subscribe()
    }

    pub fn subscribe_chart(&self) -> watch::Receiver<Option<ChartSnapshot>> {
        self.chart_store.subscribe()
    }

    pub fn connection(&self) -> StatusSnapshot {
        self.tracker.snapshot()
    }
}

impl Drop for RefreshOrchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}
