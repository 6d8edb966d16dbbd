//! Background data-synchronization coordinator.
//!
//! Wiring: the [`RefreshOrchestrator`](orchestrator::RefreshOrchestrator)
//! owns one [`PollScheduler`](scheduler::PollScheduler) per named task. Each
//! tick consults the [`InteractionGate`](gate::InteractionGate); a busy gate
//! skips the tick without network calls. Successful payloads route through a
//! [`SnapshotStore`](store::SnapshotStore), which suppresses structurally
//! equal commits, and every attempt outcome updates the shared
//! [`ConnectionTracker`](status::ConnectionTracker).

pub mod gate;
pub mod orchestrator;
pub mod scheduler;
pub mod status;
pub mod store;
pub mod task;

pub use gate::{GateGuard, InteractionGate};
pub use orchestrator::RefreshOrchestrator;
pub use scheduler::PollScheduler;
pub use status::{ConnectionStatus, ConnectionTracker, StatusSnapshot};
pub use store::SnapshotStore;
pub use task::{FetchFn, Generation, RefreshTask, ScheduleSpec};
