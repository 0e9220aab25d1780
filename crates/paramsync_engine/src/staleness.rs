//! Upper bound on how old the held state may be.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const UNKNOWN: u64 = u64::MAX;

/// Worst-case age of the currently held state, in milliseconds.
///
/// The bound is replaced after every completed poll and does not decay in
/// between: it is only as current as the last response. Until the first
/// poll completes it is unknown.
#[derive(Debug)]
pub struct StalenessTracker {
    bound_ms: AtomicU64,
}

impl StalenessTracker {
    /// Creates a tracker with an unknown bound.
    pub fn new() -> Self {
        Self {
            bound_ms: AtomicU64::new(UNKNOWN),
        }
    }

    /// Sets the bound in milliseconds.
    pub fn update(&self, bound_ms: u64) {
        self.bound_ms.store(bound_ms.min(UNKNOWN - 1), Ordering::SeqCst);
    }

    /// Records a completed poll: server-side slop plus locally measured time.
    pub fn record_poll(&self, slop_ms: u64, elapsed: Duration) -> u64 {
        let bound = staleness_bound(slop_ms, elapsed);
        self.update(bound);
        bound
    }

    /// Returns the bound, or `None` if no poll has completed yet.
    pub fn bound(&self) -> Option<Duration> {
        match self.bound_ms.load(Ordering::SeqCst) {
            UNKNOWN => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

impl Default for StalenessTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the staleness bound for a poll: `slop + elapsed`, in milliseconds.
pub fn staleness_bound(slop_ms: u64, elapsed: Duration) -> u64 {
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    slop_ms.saturating_add(elapsed_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_until_first_poll() {
        let tracker = StalenessTracker::new();
        assert!(tracker.bound().is_none());
    }

    #[test]
    fn bound_is_slop_plus_elapsed() {
        let tracker = StalenessTracker::new();
        let bound = tracker.record_poll(250, Duration::from_millis(1_234));
        assert_eq!(bound, 1_484);
        assert_eq!(tracker.bound(), Some(Duration::from_millis(1_484)));
    }

    #[test]
    fn later_poll_replaces_bound() {
        let tracker = StalenessTracker::new();
        tracker.record_poll(10_000, Duration::from_millis(5));
        tracker.record_poll(0, Duration::from_millis(40));
        assert_eq!(tracker.bound(), Some(Duration::from_millis(40)));
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        assert_eq!(staleness_bound(u64::MAX, Duration::from_secs(1)), u64::MAX);

        let tracker = StalenessTracker::new();
        tracker.update(u64::MAX);
        assert!(tracker.bound().is_some());
    }
}
