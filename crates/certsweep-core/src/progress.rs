//! Progress accounting for a running scan
//!
//! Discovery stages bump the discovered count, probe stages mark services
//! done. Each update publishes a fresh [`ProgressSnapshot`] on a watch
//! channel, so a display can follow along without touching pipeline state.
//! Nothing in the pipeline reads these numbers back.

use std::sync::Arc;

use tokio::sync::watch;

/// Point-in-time view of scan progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Services discovered so far across all contexts
    pub discovered: u64,
    /// Discovered services not yet probed
    pub remaining: u64,
    /// Contexts whose service listing failed
    pub failed_contexts: u64,
}

impl ProgressSnapshot {
    /// Services that have finished probing.
    pub fn processed(&self) -> u64 {
        self.discovered.saturating_sub(self.remaining)
    }
}

/// Shared handle the pipeline stages report progress through.
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    tx: Arc<watch::Sender<ProgressSnapshot>>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Follow progress updates.
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.tx.borrow()
    }

    /// A service was discovered and is waiting to be probed.
    pub fn service_discovered(&self) {
        self.tx.send_modify(|s| {
            s.discovered += 1;
            s.remaining += 1;
        });
    }

    /// A discovered service was never handed to a probe stage.
    pub fn service_withdrawn(&self) {
        self.tx.send_modify(|s| {
            s.discovered = s.discovered.saturating_sub(1);
            s.remaining = s.remaining.saturating_sub(1);
        });
    }

    /// A service finished probing, whatever the outcome.
    pub fn service_probed(&self) {
        self.tx.send_modify(|s| s.remaining = s.remaining.saturating_sub(1));
    }

    pub fn context_failed(&self) {
        self.tx.send_modify(|s| s.failed_contexts += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_discovered_and_remaining() {
        let progress = ProgressTracker::new();
        progress.service_discovered();
        progress.service_discovered();
        progress.service_probed();

        let snap = progress.snapshot();
        assert_eq!(snap.discovered, 2);
        assert_eq!(snap.remaining, 1);
        assert_eq!(snap.processed(), 1);
    }

    #[test]
    fn withdrawn_service_is_uncounted() {
        let progress = ProgressTracker::new();
        progress.service_discovered();
        progress.service_discovered();
        progress.service_withdrawn();

        let snap = progress.snapshot();
        assert_eq!(snap.discovered, 1);
        assert_eq!(snap.remaining, 1);
        assert_eq!(snap.processed(), 0);
    }

    #[test]
    fn remaining_never_underflows() {
        let progress = ProgressTracker::new();
        progress.service_probed();
        assert_eq!(progress.snapshot().remaining, 0);
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let progress = ProgressTracker::new();
        let mut rx = progress.subscribe();

        progress.context_failed();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().failed_contexts, 1);
    }

    #[tokio::test]
    async fn concurrent_updates_are_not_lost() {
        let progress = ProgressTracker::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let p = progress.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    p.service_discovered();
                    p.service_probed();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let snap = progress.snapshot();
        assert_eq!(snap.discovered, 800);
        assert_eq!(snap.remaining, 0);
    }
}
