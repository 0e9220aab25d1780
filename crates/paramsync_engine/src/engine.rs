//! Hosted parameter file handle.

use crate::cache::DiskCache;
use crate::config::ParamConfig;
use crate::error::ParamResult;
use crate::feed::UpdateFeed;
use crate::poller::{Collaborators, PollLoop};
use crate::signal::StopSignal;
use crate::staleness::StalenessTracker;
use crate::state::{StateHolder, VersionedState};
use crate::transport::ParameterTransport;
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A local replica of one file hosted on the parameter server.
///
/// Construction seeds the state from the disk cache (if configured) and
/// starts a background poll loop on its own thread. It never waits for
/// the network: until the first response arrives, [`current_state`]
/// returns the cached state or `None`.
///
/// Dropping the handle asks the loop to stop. An in-flight request is
/// not interrupted, so the thread may outlive the handle by up to one
/// long-poll wait. Use [`shutdown`] to wait for it.
///
/// [`current_state`]: HostedParameterFile::current_state
/// [`shutdown`]: HostedParameterFile::shutdown
pub struct HostedParameterFile {
    path: String,
    cache_path: Option<PathBuf>,
    state: Arc<StateHolder>,
    staleness: Arc<StalenessTracker>,
    feed: Arc<UpdateFeed>,
    stop: StopSignal,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HostedParameterFile {
    /// Starts tracking a file with the default collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error only if the poll thread cannot be spawned.
    pub fn new<T>(config: ParamConfig, transport: T) -> ParamResult<Self>
    where
        T: ParameterTransport + 'static,
    {
        Self::with_collaborators(config, transport, Collaborators::default())
    }

    /// Starts tracking a file with the given sleeper and diagnostic sink.
    ///
    /// # Errors
    ///
    /// Returns an error only if the poll thread cannot be spawned.
    pub fn with_collaborators<T>(
        config: ParamConfig,
        transport: T,
        collaborators: Collaborators,
    ) -> ParamResult<Self>
    where
        T: ParameterTransport + 'static,
    {
        let cache = config.cache_dir.as_deref().map(|dir| {
            Arc::new(DiskCache::new(
                dir,
                &config.path,
                Arc::clone(&collaborators.diagnostics),
            ))
        });

        let initial = cache.as_ref().and_then(|cache| cache.bootstrap());
        let state = Arc::new(StateHolder::with_initial(initial));
        if let Some(cache) = &cache {
            state.add_observer(Arc::clone(cache) as _);
        }
        for observer in &collaborators.observers {
            state.add_observer(Arc::clone(observer));
        }
        let feed = Arc::new(UpdateFeed::new());
        state.add_observer(Arc::clone(&feed) as _);

        let staleness = Arc::new(StalenessTracker::new());
        let stop = StopSignal::new();
        let poller = PollLoop::new(
            &config,
            transport,
            Arc::clone(&state),
            Arc::clone(&staleness),
            collaborators,
            stop.clone(),
        );

        // The first request never sends a version, even with a cached
        // state, so the server always confirms what the cache claims.
        let worker = thread::Builder::new()
            .name(format!("paramsync {}", config.path))
            .spawn(move || poller.run(None))?;

        Ok(Self {
            path: config.path,
            cache_path: cache.map(|c| c.path().to_path_buf()),
            state,
            staleness,
            feed,
            stop,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Returns the server path being tracked.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the cache file location, if caching is enabled.
    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    /// Returns the latest state, or `None` if nothing is known yet.
    pub fn current_state(&self) -> Option<Arc<VersionedState>> {
        self.state.current()
    }

    /// Returns the latest version, or `None` if nothing is known yet.
    pub fn current_version(&self) -> Option<u64> {
        self.state.current_version()
    }

    /// Returns how stale the current state may be, or `None` before the
    /// first completed poll.
    pub fn staleness_bound(&self) -> Option<Duration> {
        self.staleness.bound()
    }

    /// Subscribes to every state accepted from now on.
    ///
    /// The loop may already have applied states by the time this returns.
    /// Register an observer through [`Collaborators::with_observer`] to see
    /// every state from the first one on.
    pub fn subscribe(&self) -> Receiver<Arc<VersionedState>> {
        self.feed.subscribe()
    }

    /// Asks the poll loop to stop without waiting for it.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Returns true once a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Waits for the poll thread to exit.
    ///
    /// Blocks until something stops the loop. State and staleness remain
    /// readable afterwards.
    pub fn join(&self) {
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::warn!(path = %self.path, "parameter poll thread panicked");
            }
        }
    }

    /// Stops the poll loop and waits for its thread to exit.
    pub fn shutdown(self) {
        self.stop.stop();
        self.join();
    }
}

impl fmt::Display for HostedParameterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<hosted parameter file \"{}\">", self.path)
    }
}

impl fmt::Debug for HostedParameterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostedParameterFile")
            .field("path", &self.path)
            .field("version", &self.current_version())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl Drop for HostedParameterFile {
    fn drop(&mut self) {
        self.stop.stop();
    }
}
