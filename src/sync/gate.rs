//! Interaction gate: the suspension authority consulted before background
//! fetches.
//!
//! Two independent suspension sources: a set of named reasons (open modals,
//! mounted forms) and a transient interaction flag with a self-expiring
//! deadline. The flag covers mid-keystroke activity in controls that are not
//! modals, and expires on its own because blur events are not guaranteed to
//! fire on abrupt navigation.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

struct GateInner {
    reasons: HashSet<String>,
    /// Absolute expiry of the transient interaction flag; recomputed atomically
    /// on every `set_interacting(true)`, checked lazily against now.
    interaction_deadline: Option<Instant>,
}

pub struct InteractionGate {
    inner: Mutex<GateInner>,
    interaction_timeout: Duration,
}

impl InteractionGate {
    pub fn new(interaction_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(GateInner {
                reasons: HashSet::new(),
                interaction_deadline: None,
            }),
            interaction_timeout,
        }
    }

    /// Register a named suspension reason. Idempotent.
    pub fn add_reason(&self, id: impl Into<String>) {
        let id = id.into();
        let mut inner = self.inner.lock().expect("gate lock poisoned");
        if inner.reasons.insert(id.clone()) {
            debug!(reason = %id, active = inner.reasons.len(), "gate reason added");
        }
    }

    /// Remove a named suspension reason. Idempotent.
    pub fn remove_reason(&self, id: &str) {
        let mut inner = self.inner.lock().expect("gate lock poisoned");
        if inner.reasons.remove(id) {
            debug!(reason = %id, active = inner.reasons.len(), "gate reason removed");
        }
    }

    /// Set or clear the transient interaction flag. Setting restarts the
    /// expiry window; clearing cancels it immediately.
    pub fn set_interacting(&self, active: bool) {
        let mut inner = self.inner.lock().expect("gate lock poisoned");
        inner.interaction_deadline = if active {
            Some(Instant::now() + self.interaction_timeout)
        } else {
            None
        };
    }

    /// Busy iff any reason is active, or the interaction flag is set and its
    /// deadline has not yet passed. The deadline is evaluated lazily, so an
    /// abandoned flag can never suspend polling forever.
    pub fn is_busy(&self) -> bool {
        let mut inner = self.inner.lock().expect("gate lock poisoned");
        if !inner.reasons.is_empty() {
            return true;
        }
        match inner.interaction_deadline {
            Some(deadline) if Instant::now() < deadline => true,
            Some(_) => {
                // Expired; drop it so later reads skip the comparison.
                inner.interaction_deadline = None;
                false
            }
            None => false,
        }
    }

    /// Acquire a reason with guaranteed release on every exit path of the
    /// owning scope.
    pub fn acquire(self: &Arc<Self>, id: impl Into<String>) -> GateGuard {
        let id = id.into();
        self.add_reason(id.clone());
        GateGuard {
            gate: Arc::clone(self),
            reason: id,
        }
    }
}

/// RAII handle for one gate reason; removes it on drop
pub struct GateGuard {
    gate: Arc<InteractionGate>,
    reason: String,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.gate.remove_reason(&self.reason);
    }
}
