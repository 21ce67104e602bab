//! Exactly-once completion barrier for a pass
//!
//! A pass has a fixed number of keys. Each key resolves once, along one
//! path, and the signal fires when the last one does. Both the preview pass
//! and the print exporter's image loading use this.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// Everything that resolved during a pass, in resolution order
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport<K, P> {
    pub total: usize,
    pub outcomes: Vec<(K, P)>,
}

impl<K, P> PassReport<K, P> {
    /// Number of outcomes matching a predicate on the path
    pub fn count_where(&self, pred: impl Fn(&P) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, path)| pred(path)).count()
    }
}

/// Counts resolutions towards the pass total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub resolved: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.resolved >= self.total
    }
}

/// Tracks resolutions for one pass
pub struct CompletionTracker<K, P> {
    total: usize,
    seen: HashSet<K>,
    outcomes: Vec<(K, P)>,
    signal: Option<oneshot::Sender<PassReport<K, P>>>,
}

/// Receiving half, fires once the tracker completes
pub struct CompletionSignal<K, P> {
    rx: oneshot::Receiver<PassReport<K, P>>,
}

impl<K, P> CompletionTracker<K, P>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Create a tracker for `total` keys. With zero keys the signal fires
    /// immediately.
    pub fn new(total: usize) -> (Self, CompletionSignal<K, P>) {
        let (tx, rx) = oneshot::channel();
        let mut tracker = Self {
            total,
            seen: HashSet::with_capacity(total),
            outcomes: Vec::with_capacity(total),
            signal: Some(tx),
        };
        if total == 0 {
            tracker.fire();
        }
        (tracker, CompletionSignal { rx })
    }

    /// Record the resolution of `key`.
    ///
    /// A key already seen, or any key once the pass is complete, is
    /// rejected and not counted.
    pub fn resolve(&mut self, key: K, path: P) -> Result<Progress> {
        if self.signal.is_none() || self.seen.contains(&key) {
            return Err(Error::AlreadyResolved(format!("{:?}", key)));
        }

        self.seen.insert(key.clone());
        self.outcomes.push((key, path));
        log::debug!("Pass progress: {}/{}", self.seen.len(), self.total);

        let progress = self.progress();
        if progress.is_complete() {
            self.fire();
        }
        Ok(progress)
    }

    pub fn progress(&self) -> Progress {
        Progress {
            resolved: self.seen.len(),
            total: self.total,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.signal.is_none()
    }

    fn fire(&mut self) {
        if let Some(tx) = self.signal.take() {
            let report = PassReport {
                total: self.total,
                outcomes: std::mem::take(&mut self.outcomes),
            };
            // Nobody waiting is fine; the pass still counts as complete
            let _ = tx.send(report);
        }
    }
}

impl<K, P> CompletionSignal<K, P> {
    /// Wait for the pass to complete
    pub async fn wait(self) -> Result<PassReport<K, P>> {
        self.rx
            .await
            .map_err(|_| Error::General("Pass abandoned before completion".to_string()))
    }

    /// Take the report if the pass has already completed
    pub fn try_take(&mut self) -> Option<PassReport<K, P>> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Path {
        Fast,
        Slow,
    }

    #[test]
    fn test_zero_total_fires_immediately() {
        let (tracker, mut signal) = CompletionTracker::<u32, Path>::new(0);
        assert!(tracker.is_complete());
        let report = signal.try_take().expect("fired on construction");
        assert_eq!(report.total, 0);
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn test_fires_only_after_last_key() {
        let (mut tracker, mut signal) = CompletionTracker::new(3);
        tracker.resolve(1u32, Path::Fast).unwrap();
        tracker.resolve(2u32, Path::Slow).unwrap();
        assert!(signal.try_take().is_none());
        assert!(!tracker.is_complete());

        let progress = tracker.resolve(3u32, Path::Fast).unwrap();
        assert!(progress.is_complete());

        let report = signal.try_take().expect("complete");
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.count_where(|p| *p == Path::Fast), 2);
    }

    #[test]
    fn test_duplicate_resolution_not_counted() {
        let (mut tracker, mut signal) = CompletionTracker::new(2);
        tracker.resolve("a", Path::Fast).unwrap();
        let err = tracker.resolve("a", Path::Slow).unwrap_err();
        assert!(matches!(err, Error::AlreadyResolved(_)));
        assert_eq!(tracker.progress().resolved, 1);
        assert!(signal.try_take().is_none());

        tracker.resolve("b", Path::Fast).unwrap();
        let report = signal.try_take().unwrap();
        assert_eq!(report.outcomes, vec![("a", Path::Fast), ("b", Path::Fast)]);
    }

    #[test]
    fn test_resolution_after_completion_rejected() {
        let (mut tracker, _signal) = CompletionTracker::new(1);
        tracker.resolve(7u8, Path::Fast).unwrap();
        assert!(tracker.resolve(8u8, Path::Fast).is_err());
    }

    #[tokio::test]
    async fn test_wait_resolves_once_complete() {
        let (mut tracker, signal) = CompletionTracker::new(2);
        let waiter = tokio::spawn(signal.wait());
        tracker.resolve(1u64, Path::Slow).unwrap();
        tracker.resolve(2u64, Path::Slow).unwrap();
        let report = waiter.await.unwrap().unwrap();
        assert_eq!(report.total, 2);
    }

    #[tokio::test]
    async fn test_dropped_tracker_abandons_pass() {
        let (tracker, signal) = CompletionTracker::<u8, Path>::new(1);
        drop(tracker);
        assert!(signal.wait().await.is_err());
    }
}
