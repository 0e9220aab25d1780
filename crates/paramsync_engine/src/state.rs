//! Versioned file state and the holder that publishes it.

use crate::error::{ParamError, ParamResult};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Version number reserved for "file does not exist on the server".
pub const MISSING_VERSION: u64 = 0;

/// Content and timestamps of a file that exists on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileBody {
    content: String,
    creation_date: i64,
    modification_date: i64,
}

/// An immutable snapshot of one parameter file.
///
/// A state with version [`MISSING_VERSION`] never carries content or
/// timestamps; any other version always carries both. The constructors
/// enforce this, so a `VersionedState` can never violate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedState {
    version: u64,
    body: Option<FileBody>,
}

impl VersionedState {
    /// Creates the sentinel state for a file that does not exist.
    pub fn missing() -> Self {
        Self {
            version: MISSING_VERSION,
            body: None,
        }
    }

    /// Creates the state of an existing file.
    ///
    /// Dates are epoch milliseconds.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if `version` is the reserved sentinel.
    pub fn present(
        version: u64,
        content: impl Into<String>,
        creation_date: i64,
        modification_date: i64,
    ) -> ParamResult<Self> {
        if version == MISSING_VERSION {
            return Err(ParamError::Protocol(
                "version 0 is reserved for missing files".into(),
            ));
        }
        Ok(Self {
            version,
            body: Some(FileBody {
                content: content.into(),
                creation_date,
                modification_date,
            }),
        })
    }

    /// Returns the server-assigned version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns true if the file exists on the server.
    pub fn exists(&self) -> bool {
        self.body.is_some()
    }

    /// Returns the file content, or `None` for a missing file.
    pub fn content(&self) -> Option<&str> {
        self.body.as_ref().map(|b| b.content.as_str())
    }

    /// Returns the creation date in epoch milliseconds.
    pub fn creation_date(&self) -> Option<i64> {
        self.body.as_ref().map(|b| b.creation_date)
    }

    /// Returns the modification date in epoch milliseconds.
    pub fn modification_date(&self) -> Option<i64> {
        self.body.as_ref().map(|b| b.modification_date)
    }
}

/// Hook invoked for every state the holder accepts.
///
/// Observers are called one at a time, in the order states are applied,
/// after the new state is already visible to readers. They must not fail:
/// anything that can go wrong is the observer's own business to report.
pub trait StateObserver: Send + Sync {
    /// Called once per accepted state.
    fn on_state(&self, state: &Arc<VersionedState>);
}

/// Single authoritative holder of the current state of one file.
///
/// Readers take an `Arc` snapshot under a read lock and are never blocked
/// by observers. Writers are serialized so observers see states in the
/// same order readers do.
pub struct StateHolder {
    current: RwLock<Option<Arc<VersionedState>>>,
    observers: Mutex<Vec<Arc<dyn StateObserver>>>,
}

impl StateHolder {
    /// Creates a holder with no state.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Creates a holder seeded with an initial state. No observer is notified.
    pub fn with_initial(state: Option<VersionedState>) -> Self {
        Self {
            current: RwLock::new(state.map(Arc::new)),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Registers an observer for subsequent updates.
    pub fn add_observer(&self, observer: Arc<dyn StateObserver>) {
        self.observers.lock().push(observer);
    }

    /// Returns the current snapshot, if any state has been set.
    pub fn current(&self) -> Option<Arc<VersionedState>> {
        self.current.read().clone()
    }

    /// Returns the version of the current snapshot.
    pub fn current_version(&self) -> Option<u64> {
        self.current.read().as_ref().map(|s| s.version())
    }

    /// Replaces the held state unconditionally and notifies observers.
    pub fn set_state(&self, state: VersionedState) -> Arc<VersionedState> {
        let observers = self.observers.lock();
        let state = Arc::new(state);
        *self.current.write() = Some(Arc::clone(&state));

        tracing::trace!(version = state.version(), "accepted parameter file state");
        for observer in observers.iter() {
            observer.on_state(&state);
        }
        state
    }
}

impl Default for StateHolder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingObserver {
        seen: Mutex<Vec<u64>>,
    }

    impl StateObserver for CountingObserver {
        fn on_state(&self, state: &Arc<VersionedState>) {
            self.seen.lock().push(state.version());
        }
    }

    #[test]
    fn missing_state_has_no_body() {
        let state = VersionedState::missing();
        assert_eq!(state.version(), MISSING_VERSION);
        assert!(!state.exists());
        assert!(state.content().is_none());
        assert!(state.creation_date().is_none());
        assert!(state.modification_date().is_none());
    }

    #[test]
    fn present_state_has_body() {
        let state = VersionedState::present(7, "a=1", 1000, 2000).unwrap();
        assert_eq!(state.version(), 7);
        assert!(state.exists());
        assert_eq!(state.content(), Some("a=1"));
        assert_eq!(state.creation_date(), Some(1000));
        assert_eq!(state.modification_date(), Some(2000));
    }

    #[test]
    fn present_rejects_sentinel_version() {
        let result = VersionedState::present(MISSING_VERSION, "x", 1, 2);
        assert!(matches!(result, Err(ParamError::Protocol(_))));
    }

    #[test]
    fn holder_starts_empty() {
        let holder = StateHolder::new();
        assert!(holder.current().is_none());
        assert!(holder.current_version().is_none());
    }

    #[test]
    fn holder_replaces_and_notifies_in_order() {
        let holder = StateHolder::new();
        let observer = Arc::new(CountingObserver {
            seen: Mutex::new(Vec::new()),
        });
        holder.add_observer(observer.clone());

        holder.set_state(VersionedState::present(3, "a", 1, 1).unwrap());
        holder.set_state(VersionedState::missing());
        holder.set_state(VersionedState::present(5, "b", 1, 2).unwrap());

        assert_eq!(*observer.seen.lock(), vec![3, 0, 5]);
        assert_eq!(holder.current_version(), Some(5));
    }

    #[test]
    fn snapshots_survive_replacement() {
        let holder = StateHolder::with_initial(Some(VersionedState::present(1, "old", 1, 1).unwrap()));
        let snapshot = holder.current().unwrap();

        holder.set_state(VersionedState::present(2, "new", 1, 2).unwrap());

        assert_eq!(snapshot.content(), Some("old"));
        assert_eq!(holder.current().unwrap().content(), Some("new"));
    }

    #[test]
    fn initial_state_does_not_notify() {
        let holder = StateHolder::with_initial(Some(VersionedState::missing()));
        let observer = Arc::new(CountingObserver {
            seen: Mutex::new(Vec::new()),
        });
        holder.add_observer(observer.clone());

        assert!(observer.seen.lock().is_empty());
        assert_eq!(holder.current_version(), Some(0));
    }
}
