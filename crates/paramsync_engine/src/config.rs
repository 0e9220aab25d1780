//! Configuration for a hosted parameter file.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default long-poll wait. Finite to stay under idle-connection timeouts.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30);

/// Configuration for tracking one hosted parameter file.
#[derive(Debug, Clone)]
pub struct ParamConfig {
    /// Path of the file on the parameter server (e.g. `/app/flags`).
    pub path: String,
    /// Directory holding the disk cache. `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    /// How long the server may hold each long-poll request.
    pub max_wait: Duration,
    /// Backoff configuration.
    pub backoff: BackoffConfig,
    /// What to do when the server returns an older version than the one held.
    pub version_policy: VersionPolicy,
}

impl ParamConfig {
    /// Creates a configuration for the given server path with no disk cache.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            cache_dir: None,
            max_wait: DEFAULT_MAX_WAIT,
            backoff: BackoffConfig::default(),
            version_policy: VersionPolicy::default(),
        }
    }

    /// Enables the disk cache in the given directory.
    pub fn with_cache_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cache_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Sets the long-poll wait.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Sets the backoff configuration.
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the version policy.
    pub fn with_version_policy(mut self, policy: VersionPolicy) -> Self {
        self.version_policy = policy;
        self
    }
}

impl Default for ParamConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// Whether a received version may be lower than the held one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionPolicy {
    /// Trust the server and apply whatever it sends.
    #[default]
    Permissive,
    /// Refuse to apply a version lower than the one held.
    RejectRegression,
}

/// Timing policy for the poll loop.
///
/// After a success or unchanged response the loop pauses for
/// `success_pause` so that a misbehaving server answering instantly still
/// sees at most a couple of requests per second. After a failure the delay
/// jumps to `failure_floor`, then grows by `multiplier` up to `max_delay`.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Pause after a success or unchanged response.
    pub success_pause: Duration,
    /// First delay after a failure.
    pub failure_floor: Duration,
    /// Upper bound for failure delays.
    pub max_delay: Duration,
    /// Growth factor between consecutive failures.
    pub multiplier: u32,
}

impl BackoffConfig {
    /// Creates the default policy: 500 ms pause, 5 s floor, doubling to 60 s.
    pub fn new() -> Self {
        Self {
            success_pause: Duration::from_millis(500),
            failure_floor: Duration::from_millis(5_000),
            max_delay: Duration::from_millis(60_000),
            multiplier: 2,
        }
    }

    /// Sets the pause applied after a success.
    pub fn with_success_pause(mut self, pause: Duration) -> Self {
        self.success_pause = pause;
        self
    }

    /// Sets the first failure delay.
    pub fn with_failure_floor(mut self, floor: Duration) -> Self {
        self.failure_floor = floor;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Calculates the delay after a failure, given the delay currently in force.
    pub fn next_failure_delay(&self, current: Duration) -> Duration {
        if current < self.failure_floor {
            self.failure_floor
        } else {
            current
                .checked_mul(self.multiplier)
                .unwrap_or(self.max_delay)
                .min(self.max_delay)
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::new()
    }
}
