//! Warnings raised by the engine without interrupting it.
//!
//! Nothing in the engine is fatal: cache problems become cache misses and
//! network problems become backoff. Each of these is reported as a
//! [`Diagnostic`] to a [`DiagnosticSink`], which by default logs it.

use parking_lot::Mutex;
use std::fmt;
use std::path::PathBuf;

/// A recoverable problem observed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The cache file exists but could not be read.
    CacheUnreadable {
        /// Cache file path.
        path: PathBuf,
        /// Underlying error.
        reason: String,
    },
    /// The cache file has no header terminator.
    CacheHeaderMissing {
        /// Cache file path.
        path: PathBuf,
    },
    /// The cache header could not be decoded.
    CacheHeaderInvalid {
        /// Cache file path.
        path: PathBuf,
        /// Underlying error.
        reason: String,
    },
    /// Writing the cache file failed.
    CacheWriteFailed {
        /// Cache file path.
        path: PathBuf,
        /// Underlying error.
        reason: String,
    },
    /// The server asked us to back off.
    RateLimited {
        /// Status returned by the server.
        status: String,
        /// Message returned by the server.
        message: Option<String>,
    },
    /// The server returned a non-success status.
    BadResponse {
        /// Status returned by the server.
        status: String,
        /// Message returned by the server.
        message: Option<String>,
    },
    /// The request or response decoding failed.
    FetchFailed {
        /// Underlying error.
        reason: String,
    },
    /// The server returned an older version than the one held, and it was refused.
    VersionRegression {
        /// Version currently held.
        held: u64,
        /// Version the server returned.
        received: u64,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = |m: &Option<String>| m.clone().unwrap_or_else(|| "<none>".into());
        match self {
            Diagnostic::CacheUnreadable { path, reason } => {
                write!(f, "error reading cache file [{}]: {reason}", path.display())
            }
            Diagnostic::CacheHeaderMissing { path } => write!(
                f,
                "cache file [{}] does not contain a proper header",
                path.display()
            ),
            Diagnostic::CacheHeaderInvalid { path, reason } => write!(
                f,
                "error decoding cache file [{}]: {reason}",
                path.display()
            ),
            Diagnostic::CacheWriteFailed { path, reason } => {
                write!(f, "error writing cache file [{}]: {reason}", path.display())
            }
            Diagnostic::RateLimited { status, message: m } => write!(
                f,
                "parameter server returned status [{status}], message [{}]; backing off",
                message(m)
            ),
            Diagnostic::BadResponse { status, message: m } => write!(
                f,
                "bad response from parameter server (status [{status}], message [{}])",
                message(m)
            ),
            Diagnostic::FetchFailed { reason } => {
                write!(f, "error communicating with parameter server: {reason}")
            }
            Diagnostic::VersionRegression { held, received } => write!(
                f,
                "parameter server returned version {received} older than held version {held}; ignoring"
            ),
        }
    }
}

/// Destination for diagnostics.
pub trait DiagnosticSink: Send + Sync {
    /// Reports a recoverable problem.
    fn report(&self, diagnostic: Diagnostic);
}

/// Sink that logs every diagnostic at warning level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::warn!("{}", diagnostic);
    }
}

/// Sink that keeps every diagnostic in memory, for tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    recorded: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything reported so far.
    pub fn recorded(&self) -> Vec<Diagnostic> {
        self.recorded.lock().clone()
    }

    /// Returns the number of diagnostics reported so far.
    pub fn len(&self) -> usize {
        self.recorded.lock().len()
    }

    /// Returns true if nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.recorded.lock().is_empty()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.recorded.lock().push(diagnostic);
    }
}
