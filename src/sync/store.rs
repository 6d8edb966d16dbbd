//! Snapshot store: holds the latest server-derived payload for one resource
//! group and only notifies subscribers when the payload actually changed.

use tokio::sync::watch;

/// Latest-value store with structural-equality change suppression.
///
/// `None` is the explicit empty sentinel before the first commit. Commits are
/// a single atomic compare-and-set; a candidate equal to the held snapshot is
/// a no-op and never wakes subscribers.
pub struct SnapshotStore<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone + PartialEq> SnapshotStore<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Replace the held snapshot with `candidate`. Returns whether a change
    /// actually occurred.
    pub fn commit(&self, candidate: T) -> bool {
        self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&candidate) {
                false
            } else {
                *current = Some(candidate);
                true
            }
        })
    }

    /// The currently held snapshot, or `None` before the first commit
    pub fn current(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    /// Receiver that wakes only on real changes
    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.tx.subscribe()
    }
}

impl<T: Clone + PartialEq> Default for SnapshotStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let store: SnapshotStore<Vec<u32>> = SnapshotStore::new();
        assert_eq!(store.current(), None);
    }

    #[test]
    fn first_commit_is_a_change() {
        let store = SnapshotStore::new();
        assert!(store.commit(vec![1, 2, 3]));
        assert_eq!(store.current(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn equal_payload_is_a_noop() {
        let store = SnapshotStore::new();
        assert!(store.commit(vec![1, 2, 3]));
        assert!(!store.commit(vec![1, 2, 3]));
        assert!(store.commit(vec![1, 2, 4]));
    }

    #[tokio::test]
    async fn subscribers_wake_only_on_change() {
        let store = SnapshotStore::new();
        let mut rx = store.subscribe();

        store.commit("a".to_string());
        assert!(rx.has_changed().expect("sender alive"));
        rx.borrow_and_update();

        store.commit("a".to_string());
        assert!(!rx.has_changed().expect("sender alive"));

        store.commit("b".to_string());
        assert!(rx.has_changed().expect("sender alive"));
    }
}
