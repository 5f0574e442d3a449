//! In-memory registry of running and finished workflows.
//!
//! Each entry holds the receiving end of a progress channel. Once the
//! registry exceeds its capacity, finished entries are evicted oldest first.
//! Running entries are never evicted.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::observability::metrics;

/// Progress values that know when they are done.
pub trait Terminal {
    fn is_terminal(&self) -> bool;
}

impl Terminal for crate::orchestrator::status::ActionStatus {
    fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

struct Slot<T> {
    seq: u64,
    rx: watch::Receiver<T>,
}

/// Thread-safe map from session id to live progress.
#[derive(Clone)]
pub struct SessionRegistry<T> {
    inner: Arc<DashMap<Uuid, Slot<T>>>,
    seq: Arc<AtomicU64>,
    capacity: usize,
    kind: &'static str,
}

impl<T> SessionRegistry<T>
where
    T: Terminal + Clone + Send + Sync + 'static,
{
    pub fn new(kind: &'static str, capacity: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            seq: Arc::new(AtomicU64::new(0)),
            capacity: capacity.max(1),
            kind,
        }
    }

    /// Track a new workflow and return its id.
    pub fn insert(&self, rx: watch::Receiver<T>) -> Uuid {
        let id = Uuid::new_v4();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.inner.insert(id, Slot { seq, rx });
        self.evict();
        metrics::record_active_sessions(self.inner.len());
        tracing::debug!(kind = self.kind, session_id = %id, "Session started");
        id
    }

    /// Latest progress of a session.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.inner.get(id).map(|slot| slot.rx.borrow().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn running(&self) -> usize {
        self.inner
            .iter()
            .filter(|slot| !slot.rx.borrow().is_terminal())
            .count()
    }

    fn evict(&self) {
        let excess = self.inner.len().saturating_sub(self.capacity);
        if excess == 0 {
            return;
        }

        let mut finished: Vec<(u64, Uuid)> = self
            .inner
            .iter()
            .filter(|slot| slot.rx.borrow().is_terminal())
            .map(|slot| (slot.seq, *slot.key()))
            .collect();
        finished.sort_unstable();

        for (_, id) in finished.into_iter().take(excess) {
            self.inner.remove(&id);
            tracing::debug!(kind = self.kind, session_id = %id, "Session evicted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Step(bool);

    impl Terminal for Step {
        fn is_terminal(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn test_get_reflects_latest_value() {
        let registry = SessionRegistry::new("test", 4);
        let (tx, rx) = watch::channel(Step(false));
        let id = registry.insert(rx);
        assert_eq!(registry.get(&id), Some(Step(false)));
        tx.send_replace(Step(true));
        assert_eq!(registry.get(&id), Some(Step(true)));
        assert!(registry.get(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_evicts_oldest_finished_only() {
        let registry = SessionRegistry::new("test", 2);
        let (_running_tx, running_rx) = watch::channel(Step(false));
        let running = registry.insert(running_rx);
        let (_a_tx, a_rx) = watch::channel(Step(true));
        let a = registry.insert(a_rx);
        let (_b_tx, b_rx) = watch::channel(Step(true));
        let b = registry.insert(b_rx);

        assert_eq!(registry.len(), 2);
        assert!(registry.get(&running).is_some());
        assert!(registry.get(&a).is_none());
        assert!(registry.get(&b).is_some());
        assert_eq!(registry.running(), 1);
    }

    #[test]
    fn test_running_sessions_may_exceed_capacity() {
        let registry = SessionRegistry::new("test", 1);
        let mut senders = Vec::new();
        for _ in 0..3 {
            let (tx, rx) = watch::channel(Step(false));
            senders.push(tx);
            registry.insert(rx);
        }
        assert_eq!(registry.len(), 3);
    }
}
