//! Transport layer abstraction for fetching parameter files.

use crate::error::{ParamError, ParamResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A transport performs the remote `getFile` call.
///
/// The call blocks until the server has a version newer than
/// `expected_version`, or until roughly `max_wait` has elapsed, and returns
/// the raw JSON response text. Authentication, TLS and connection pooling
/// all live behind this trait.
pub trait ParameterTransport: Send + Sync {
    /// Fetches a parameter file.
    fn get_file(
        &self,
        path: &str,
        expected_version: Option<u64>,
        max_wait: Duration,
    ) -> ParamResult<String>;
}

impl<T: ParameterTransport + ?Sized> ParameterTransport for Arc<T> {
    fn get_file(
        &self,
        path: &str,
        expected_version: Option<u64>,
        max_wait: Duration,
    ) -> ParamResult<String> {
        (**self).get_file(path, expected_version, max_wait)
    }
}

/// A request observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Requested path.
    pub path: String,
    /// Version the caller already holds.
    pub expected_version: Option<u64>,
    /// Long-poll wait.
    pub max_wait: Duration,
}

/// A mock transport for testing.
///
/// Responses are returned in the order they were queued. When the queue
/// is empty every call fails with a retryable transport error.
#[derive(Debug)]
pub struct MockTransport {
    connected: AtomicBool,
    responses: Mutex<VecDeque<ParamResult<String>>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a raw response body.
    pub fn push_response(&self, body: impl Into<String>) {
        self.responses.lock().push_back(Ok(body.into()));
    }

    /// Queues a transport failure.
    pub fn push_error(&self, error: ParamError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Returns the requests seen so far.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of queued responses not yet consumed.
    pub fn pending(&self) -> usize {
        self.responses.lock().len()
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterTransport for MockTransport {
    fn get_file(
        &self,
        path: &str,
        expected_version: Option<u64>,
        max_wait: Duration,
    ) -> ParamResult<String> {
        self.requests.lock().push(FetchRequest {
            path: path.to_string(),
            expected_version,
            max_wait,
        });

        if !self.connected.load(Ordering::SeqCst) {
            return Err(ParamError::NotConnected);
        }
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ParamError::transport_retryable("no mock response queued")))
    }
}
