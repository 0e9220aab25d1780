//! The long-poll loop.
//!
//! One loop runs per tracked file. Each iteration issues a blocking
//! `getFile` request carrying the version already held, applies whatever
//! the server answers, and sleeps before the next request:
//!
//! - success / unchanged: pause `success_pause` (500 ms) as a guard against
//!   a server that answers instantly over and over
//! - any failure: wait `failure_floor` (5 s), doubling up to `max_delay` (60 s)
//!
//! The backoff delay lives on the loop's stack and is reset by the next
//! success or unchanged response. No failure ever ends the loop; only the
//! stop signal does, checked before each request and during each sleep.

use crate::config::{BackoffConfig, ParamConfig, VersionPolicy};
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::ParamResult;
use crate::response::{FetchResponse, ResponseStatus};
use crate::signal::{Sleeper, StopSignal, ThreadSleeper};
use crate::staleness::StalenessTracker;
use crate::state::{StateHolder, StateObserver, VersionedState, MISSING_VERSION};
use crate::transport::ParameterTransport;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pluggable pieces of the poll loop's environment.
#[derive(Clone)]
pub struct Collaborators {
    /// Sleeps between iterations.
    pub sleeper: Arc<dyn Sleeper>,
    /// Receives every recoverable problem.
    pub diagnostics: Arc<dyn DiagnosticSink>,
    /// Extra observers registered before the loop starts.
    pub observers: Vec<Arc<dyn StateObserver>>,
}

impl Collaborators {
    /// Creates the default collaborators: real sleeps, warnings via `tracing`.
    pub fn new() -> Self {
        Self {
            sleeper: Arc::new(ThreadSleeper),
            diagnostics: Arc::new(TracingSink),
            observers: Vec::new(),
        }
    }

    /// Sets the sleeper.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Sets the diagnostic sink.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Adds an observer that sees every accepted state, starting with the
    /// first one the loop applies.
    pub fn with_observer(mut self, observer: Arc<dyn StateObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single poll iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new state with this version was applied.
    Updated(u64),
    /// The file does not exist; the sentinel state was applied.
    Missing,
    /// The held version is still current.
    Unchanged,
    /// The request failed or the server reported an error.
    Failed,
}

impl PollOutcome {
    /// Returns true if the response was a success of any kind.
    pub fn is_success(&self) -> bool {
        !matches!(self, PollOutcome::Failed)
    }
}

/// Loop-local backoff state.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    /// Starts at the success pause, so the first failure waits the floor.
    pub fn new(config: BackoffConfig) -> Self {
        let current = config.success_pause;
        Self { config, current }
    }

    /// Returns the delay to apply after the given outcome.
    pub fn next_delay(&mut self, outcome: PollOutcome) -> Duration {
        self.current = if outcome.is_success() {
            self.config.success_pause
        } else {
            self.config.next_failure_delay(self.current)
        };
        self.current
    }
}

/// The perpetual fetch/apply/sleep loop for one file.
pub struct PollLoop<T: ParameterTransport> {
    path: String,
    max_wait: Duration,
    backoff: BackoffConfig,
    version_policy: VersionPolicy,
    transport: T,
    state: Arc<StateHolder>,
    staleness: Arc<StalenessTracker>,
    collaborators: Collaborators,
    stop: StopSignal,
}

impl<T: ParameterTransport> PollLoop<T> {
    /// Creates a poll loop writing into `state` and `staleness`.
    pub fn new(
        config: &ParamConfig,
        transport: T,
        state: Arc<StateHolder>,
        staleness: Arc<StalenessTracker>,
        collaborators: Collaborators,
        stop: StopSignal,
    ) -> Self {
        Self {
            path: config.path.clone(),
            max_wait: config.max_wait,
            backoff: config.backoff.clone(),
            version_policy: config.version_policy,
            transport,
            state,
            staleness,
            collaborators,
            stop,
        }
    }

    /// Runs until the stop signal fires.
    ///
    /// `initial_expected` is sent with the first request. Every later
    /// request sends the version held at that moment.
    pub fn run(&self, initial_expected: Option<u64>) {
        let mut backoff = Backoff::new(self.backoff.clone());
        let mut expected = initial_expected;

        tracing::debug!(path = %self.path, "starting parameter poll loop");
        while !self.stop.is_stopped() {
            let outcome = self.poll_once(expected);
            let delay = backoff.next_delay(outcome);

            if !self.collaborators.sleeper.sleep(delay, &self.stop) {
                break;
            }
            expected = self.state.current_version();
        }
        tracing::debug!(path = %self.path, "parameter poll loop stopped");
    }

    /// Performs one request and applies its response.
    pub fn poll_once(&self, expected: Option<u64>) -> PollOutcome {
        let started = Instant::now();
        let outcome = match self.fetch(expected) {
            Ok(response) => self.apply(&response, started),
            Err(e) => {
                self.report(Diagnostic::FetchFailed {
                    reason: e.to_string(),
                });
                PollOutcome::Failed
            }
        };
        tracing::debug!(
            path = %self.path,
            ?expected,
            ?outcome,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "parameter poll completed"
        );
        outcome
    }

    fn fetch(&self, expected: Option<u64>) -> ParamResult<FetchResponse> {
        let raw = self.transport.get_file(&self.path, expected, self.max_wait)?;
        FetchResponse::parse(&raw)
    }

    fn apply(&self, response: &FetchResponse, started: Instant) -> PollOutcome {
        match response.classify() {
            ResponseStatus::NoSuchFile => {
                self.record_staleness(response, started);
                self.state.set_state(VersionedState::missing());
                PollOutcome::Missing
            }
            ResponseStatus::Unchanged => {
                self.record_staleness(response, started);
                PollOutcome::Unchanged
            }
            ResponseStatus::Updated => {
                let state = match response.to_state() {
                    Ok(state) => state,
                    Err(e) => {
                        self.report(Diagnostic::FetchFailed {
                            reason: e.to_string(),
                        });
                        return PollOutcome::Failed;
                    }
                };
                if let Some(held) = self.regressed_from(&state) {
                    self.report(Diagnostic::VersionRegression {
                        held,
                        received: state.version(),
                    });
                    return PollOutcome::Failed;
                }
                self.record_staleness(response, started);
                let version = self.state.set_state(state).version();
                PollOutcome::Updated(version)
            }
            ResponseStatus::RateLimited => {
                self.report(Diagnostic::RateLimited {
                    status: response.status.clone(),
                    message: response.message.clone(),
                });
                PollOutcome::Failed
            }
            ResponseStatus::Failed => {
                self.report(Diagnostic::BadResponse {
                    status: response.status.clone(),
                    message: response.message.clone(),
                });
                PollOutcome::Failed
            }
        }
    }

    /// Returns the held version if applying `state` would move backwards
    /// and the policy forbids it.
    fn regressed_from(&self, state: &VersionedState) -> Option<u64> {
        if self.version_policy != VersionPolicy::RejectRegression {
            return None;
        }
        self.state
            .current_version()
            .filter(|held| *held != MISSING_VERSION && state.version() < *held)
    }

    fn record_staleness(&self, response: &FetchResponse, started: Instant) {
        self.staleness
            .record_poll(response.staleness_slop, started.elapsed());
    }

    fn report(&self, diagnostic: Diagnostic) {
        self.collaborators.diagnostics.report(diagnostic);
    }
}
