//! Connection status tracker: a pure projection of the most recent fetch
//! attempt across all tasks sharing the tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Connection state derived from fetch outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

/// Point-in-time view for the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: ConnectionStatus,
    /// Timestamp of the last successful transition to `Connected`
    pub last_connected_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

pub struct ConnectionTracker {
    inner: Mutex<StatusSnapshot>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StatusSnapshot {
                status: ConnectionStatus::Idle,
                last_connected_at: None,
                last_error: None,
            }),
        }
    }

    pub fn on_attempt_start(&self) {
        let mut inner = self.inner.lock().expect("tracker lock poisoned");
        inner.status = ConnectionStatus::Connecting;
    }

    pub fn on_attempt_success(&self) {
        let mut inner = self.inner.lock().expect("tracker lock poisoned");
        inner.status = ConnectionStatus::Connected;
        inner.last_connected_at = Some(Utc::now());
        inner.last_error = None;
    }

    pub fn on_attempt_failure(&self, message: impl Into<String>) {
        let mut inner = self.inner.lock().expect("tracker lock poisoned");
        inner.status = ConnectionStatus::Error;
        inner.last_error = Some(message.into());
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.lock().expect("tracker lock poisoned").clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.lock().expect("tracker lock poisoned").status
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let tracker = ConnectionTracker::new();
        let snap = tracker.snapshot();
        assert_eq!(snap.status, ConnectionStatus::Idle);
        assert_eq!(snap.last_connected_at, None);
        assert_eq!(snap.last_error, None);
    }

    #[test]
    fn projects_most_recent_attempt() {
        let tracker = ConnectionTracker::new();

        tracker.on_attempt_start();
        assert_eq!(tracker.status(), ConnectionStatus::Connecting);

        tracker.on_attempt_success();
        let snap = tracker.snapshot();
        assert_eq!(snap.status, ConnectionStatus::Connected);
        assert!(snap.last_connected_at.is_some());
        assert_eq!(snap.last_error, None);

        tracker.on_attempt_start();
        tracker.on_attempt_failure("Network error: connection refused");
        let snap = tracker.snapshot();
        assert_eq!(snap.status, ConnectionStatus::Error);
        assert_eq!(
            snap.last_error.as_deref(),
            Some("Network error: connection refused")
        );
        // last good connection timestamp survives the failure
        assert!(snap.last_connected_at.is_some());
    }

    #[test]
    fn success_clears_the_error() {
        let tracker = ConnectionTracker::new();
        tracker.on_attempt_failure("boom");
        tracker.on_attempt_success();
        assert_eq!(tracker.snapshot().last_error, None);
    }
}
