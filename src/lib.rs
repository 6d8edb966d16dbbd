pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod sync;

pub use api::{DashboardApi, HttpDashboardApi};
pub use config::AppConfig;
pub use domain::{
    AdjustUnitsRequest, AssignMeterRequest, ChartPeriod, ChartPoint, ChartSnapshot, LowUnitsMeter,
    SummarySnapshot, TaskId, Transaction,
};
pub use error::{Result, SyncError};
pub use sync::{
    ConnectionStatus, ConnectionTracker, GateGuard, InteractionGate, PollScheduler,
    RefreshOrchestrator, RefreshTask, ScheduleSpec, SnapshotStore, StatusSnapshot,
};
