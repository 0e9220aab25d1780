//! Update notifications for subscribers.

use crate::state::{StateObserver, VersionedState};
use parking_lot::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// Fans accepted states out to channel subscribers.
///
/// Each subscriber receives every state accepted after it subscribed,
/// exactly once and in apply order. Dropped receivers are pruned on the
/// next update.
#[derive(Default)]
pub struct UpdateFeed {
    subscribers: Mutex<Vec<Sender<Arc<VersionedState>>>>,
}

impl UpdateFeed {
    /// Creates a feed with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to future updates.
    pub fn subscribe(&self) -> Receiver<Arc<VersionedState>> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl StateObserver for UpdateFeed {
    fn on_state(&self, state: &Arc<VersionedState>) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(Arc::clone(state)).is_ok());
    }
}
