//! Stop signal and inter-poll sleeping.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cloneable cancellation flag shared between an engine and its poll loop.
///
/// Once stopped it stays stopped. Waiters are woken immediately.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<StopInner>,
}

#[derive(Debug, Default)]
struct StopInner {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl StopSignal {
    /// Creates a signal that has not been stopped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop and wakes every waiter.
    pub fn stop(&self) {
        let mut stopped = self.inner.stopped.lock();
        *stopped = true;
        self.inner.condvar.notify_all();
    }

    /// Returns true once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        *self.inner.stopped.lock()
    }

    /// Blocks for up to `timeout`, returning early on stop.
    ///
    /// Returns true if the signal is stopped. A timeout too large to
    /// represent as a deadline waits for the stop alone.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut stopped = self.inner.stopped.lock();
        while !*stopped {
            match deadline {
                Some(deadline) => {
                    if self
                        .inner
                        .condvar
                        .wait_until(&mut stopped, deadline)
                        .timed_out()
                    {
                        break;
                    }
                }
                None => self.inner.condvar.wait(&mut stopped),
            }
        }
        *stopped
    }
}

/// Sleeps between poll iterations.
pub trait Sleeper: Send + Sync {
    /// Sleeps for `duration` unless `stop` fires first.
    ///
    /// Returns false if the loop should stop.
    fn sleep(&self, duration: Duration, stop: &StopSignal) -> bool;
}

/// Real sleeper backed by the stop signal's condition variable.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration, stop: &StopSignal) -> bool {
        !stop.wait_timeout(duration)
    }
}

/// Sleeper that records requested durations without sleeping.
///
/// After `limit` sleeps it stops the loop, which makes poll loop tests
/// deterministic.
#[derive(Debug)]
pub struct RecordingSleeper {
    limit: usize,
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Creates a sleeper that ends the loop on its `limit`-th sleep.
    pub fn stopping_after(limit: usize) -> Self {
        Self {
            limit,
            slept: Mutex::new(Vec::new()),
        }
    }

    /// Returns the durations requested so far, in milliseconds.
    pub fn slept_millis(&self) -> Vec<u128> {
        self.slept.lock().iter().map(Duration::as_millis).collect()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration, stop: &StopSignal) -> bool {
        let mut slept = self.slept.lock();
        slept.push(duration);
        if slept.len() >= self.limit {
            stop.stop();
        }
        !stop.is_stopped()
    }
}
