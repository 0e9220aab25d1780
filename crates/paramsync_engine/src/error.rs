//! Error types for the parameter engine.

use thiserror::Error;

/// Result type for parameter engine operations.
pub type ParamResult<T> = Result<T, ParamError>;

/// Errors that can occur while fetching, decoding, or caching a parameter file.
#[derive(Error, Debug)]
pub enum ParamError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The server response did not match the expected shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The response or cache header was not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The cache file exists but cannot be decoded.
    #[error("cache corrupted: {0}")]
    CacheCorrupted(String),

    /// Not connected.
    #[error("not connected to parameter server")]
    NotConnected,
}

impl ParamError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    ///
    /// The poll loop retries everything regardless; this is for callers
    /// driving [`ParameterTransport`](crate::ParameterTransport) directly.
    pub fn is_retryable(&self) -> bool {
        match self {
            ParamError::Transport { retryable, .. } => *retryable,
            ParamError::Protocol(_) | ParamError::Json(_) | ParamError::NotConnected => true,
            _ => false,
        }
    }
}
