//! # Paramsync Engine
//!
//! Keeps a local, versioned replica of a file hosted on a parameter server.
//!
//! This crate provides:
//! - A long-poll loop with exponential backoff on failure
//! - Immutable versioned snapshots safe to read while the loop runs
//! - A staleness bound for callers that need a freshness guarantee
//! - A disk cache that lets a new process start without the network
//! - Transport, HTTP client, sleeper and diagnostic seams for embedding
//!
//! ## Architecture
//!
//! Constructing a [`HostedParameterFile`]:
//! 1. Seeds the state from the disk cache, if one is configured and readable
//! 2. Starts the poll loop on a dedicated thread
//! 3. Returns immediately, possibly with no state yet
//!
//! Every accepted state replaces the previous one wholesale, is written
//! back to the disk cache, and is sent to subscribers.
//!
//! ## Key Invariants
//!
//! - The server is authoritative; the loop is the only writer
//! - Version 0 means "no such file" and carries no content or dates
//! - No failure is fatal: network errors back off, cache errors are misses
//! - Readers always see a complete snapshot
//!
//! ## Example
//!
//! ```rust,no_run
//! use paramsync_engine::{HostedParameterFile, MockTransport, ParamConfig};
//!
//! let config = ParamConfig::new("/app/flags").with_cache_dir("/var/cache/params");
//! let file = HostedParameterFile::new(config, MockTransport::new()).unwrap();
//!
//! if let Some(state) = file.current_state() {
//!     println!("version {}: {:?}", state.version(), state.content());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod diagnostics;
mod engine;
mod error;
mod feed;
mod http;
mod poller;
mod response;
mod signal;
mod staleness;
mod state;
mod transport;

pub use cache::{cache_file_name, cache_file_path, CacheHeader, CacheRecord, DiskCache};
pub use config::{BackoffConfig, ParamConfig, VersionPolicy, DEFAULT_MAX_WAIT};
pub use diagnostics::{Diagnostic, DiagnosticSink, RecordingSink, TracingSink};
pub use engine::HostedParameterFile;
pub use error::{ParamError, ParamResult};
pub use feed::UpdateFeed;
pub use http::{GetFileRequest, HttpClient, HttpTransport, GET_FILE_ENDPOINT};
pub use poller::{Backoff, Collaborators, PollLoop, PollOutcome};
pub use response::{FetchResponse, ResponseStatus, MISSING_STATUS};
pub use signal::{RecordingSleeper, Sleeper, StopSignal, ThreadSleeper};
pub use staleness::{staleness_bound, StalenessTracker};
pub use state::{StateHolder, StateObserver, VersionedState, MISSING_VERSION};
pub use transport::{FetchRequest, MockTransport, ParameterTransport};
