//! Disk cache for a parameter file.
//!
//! Each tracked file is mirrored to a single cache file so that a freshly
//! started process can present a value before the first network round trip.
//!
//! # File Format
//!
//! ```text
//! {"version":7,"createDate":1000,"modDate":2000}a=1
//! ```
//!
//! A flat JSON header followed immediately by the raw content, with no
//! separator. The header holds only numbers, so its first `}` is the
//! boundary. A missing file (version 0) has a header with only `version`
//! and no content.
//!
//! The cache is best-effort in both directions. A missing or corrupt file
//! is a cache miss; a failed write is reported and otherwise ignored.

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::{ParamError, ParamResult};
use crate::state::{StateObserver, VersionedState, MISSING_VERSION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Prefix of the temporary file written before the rename.
const TEMP_PREFIX: &str = ".paramsync-";

/// Header block at the start of a cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHeader {
    /// File version.
    pub version: u64,
    /// Creation date in epoch milliseconds, present iff the file exists.
    #[serde(rename = "createDate", default, skip_serializing_if = "Option::is_none")]
    pub create_date: Option<i64>,
    /// Modification date in epoch milliseconds, present iff the file exists.
    #[serde(rename = "modDate", default, skip_serializing_if = "Option::is_none")]
    pub mod_date: Option<i64>,
}

/// Encoding and decoding of cache file contents.
pub struct CacheRecord;

impl CacheRecord {
    /// Encodes a state as header followed by content.
    pub fn encode(state: &VersionedState) -> ParamResult<String> {
        let header = CacheHeader {
            version: state.version(),
            create_date: state.creation_date(),
            mod_date: state.modification_date(),
        };
        let mut out = serde_json::to_string(&header)?;
        if let Some(content) = state.content() {
            out.push_str(content);
        }
        Ok(out)
    }

    /// Splits cache text into header text (including its `}`) and content.
    ///
    /// Returns `None` if there is no terminator, or if it is the first byte.
    pub fn split(text: &str) -> Option<(&str, &str)> {
        match text.find('}') {
            Some(end) if end > 0 => Some(text.split_at(end + 1)),
            _ => None,
        }
    }

    /// Decodes the header block.
    pub fn decode_header(header: &str) -> ParamResult<CacheHeader> {
        Ok(serde_json::from_str(header)?)
    }

    /// Builds a state from a decoded header and the content that followed it.
    pub fn build_state(header: &CacheHeader, content: &str) -> ParamResult<VersionedState> {
        if header.version == MISSING_VERSION {
            return Ok(VersionedState::missing());
        }
        match (header.create_date, header.mod_date) {
            (Some(created), Some(modified)) => {
                VersionedState::present(header.version, content, created, modified)
            }
            _ => Err(ParamError::CacheCorrupted(format!(
                "header for version {} lacks createDate/modDate",
                header.version
            ))),
        }
    }

    /// Decodes a whole cache file.
    pub fn decode(text: &str) -> ParamResult<VersionedState> {
        let (header, content) = Self::split(text)
            .ok_or_else(|| ParamError::CacheCorrupted("missing header terminator".into()))?;
        let header = Self::decode_header(header)?;
        Self::build_state(&header, content)
    }
}

/// Returns the cache file name for a server path: every `/` becomes `|`.
pub fn cache_file_name(path: &str) -> String {
    path.replace('/', "|")
}

/// Returns the cache file location for a server path inside `cache_dir`.
pub fn cache_file_path(cache_dir: &Path, path: &str) -> PathBuf {
    cache_dir.join(cache_file_name(path))
}

/// Persistent mirror of one parameter file's state.
pub struct DiskCache {
    path: PathBuf,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl DiskCache {
    /// Creates a cache for the given server path inside `cache_dir`.
    pub fn new(cache_dir: &Path, file_path: &str, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            path: cache_file_path(cache_dir, file_path),
            diagnostics,
        }
    }

    /// Returns the cache file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and decodes a cache file, returning every failure as an error.
    pub fn read_record(path: &Path) -> ParamResult<VersionedState> {
        let text = fs::read_to_string(path)?;
        CacheRecord::decode(&text)
    }

    /// Loads the initial state from the cache file.
    ///
    /// Returns `None` on any cache miss. A corrupt or unreadable file
    /// produces exactly one diagnostic; an absent file produces none.
    pub fn bootstrap(&self) -> Option<VersionedState> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                self.diagnostics.report(Diagnostic::CacheUnreadable {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
                return None;
            }
        };

        let Some((header, content)) = CacheRecord::split(&text) else {
            self.diagnostics.report(Diagnostic::CacheHeaderMissing {
                path: self.path.clone(),
            });
            return None;
        };

        let state = CacheRecord::decode_header(header)
            .and_then(|header| CacheRecord::build_state(&header, content));
        match state {
            Ok(state) => {
                tracing::debug!(
                    path = %self.path.display(),
                    version = state.version(),
                    "loaded parameter file from cache"
                );
                Some(state)
            }
            Err(e) => {
                self.diagnostics.report(Diagnostic::CacheHeaderInvalid {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    /// Writes a state to the cache file.
    ///
    /// The record is written to a temporary file and renamed over the
    /// cache file, so the header and body always land together. The
    /// temporary file is created exclusively under a random name and never
    /// replaces an existing file; it is removed if the write fails.
    pub fn write(&self, state: &VersionedState) -> ParamResult<()> {
        let data = CacheRecord::encode(state)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(dir)?;
        temp.write_all(data.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Writes a state, reporting rather than returning failures.
    pub fn persist(&self, state: &VersionedState) {
        if let Err(e) = self.write(state) {
            self.diagnostics.report(Diagnostic::CacheWriteFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            });
        }
    }
}

impl StateObserver for DiskCache {
    fn on_state(&self, state: &Arc<VersionedState>) {
        self.persist(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;
    use tempfile::tempdir;

    fn cache_in(dir: &Path) -> (DiskCache, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        (DiskCache::new(dir, "/app/flags", sink.clone()), sink)
    }

    #[test]
    fn file_name_replaces_slashes() {
        assert_eq!(cache_file_name("/app/flags"), "|app|flags");
        assert_eq!(cache_file_name("plain"), "plain");
        assert_eq!(
            cache_file_path(Path::new("/c"), "/a/b"),
            PathBuf::from("/c/|a|b")
        );
    }

    #[test]
    fn encode_present_state() {
        let state = VersionedState::present(7, "a=1", 1000, 2000).unwrap();
        let text = CacheRecord::encode(&state).unwrap();
        assert_eq!(text, r#"{"version":7,"createDate":1000,"modDate":2000}a=1"#);
    }

    #[test]
    fn encode_missing_state_has_no_body() {
        let text = CacheRecord::encode(&VersionedState::missing()).unwrap();
        assert_eq!(text, r#"{"version":0}"#);
    }

    #[test]
    fn content_may_contain_braces() {
        let state = VersionedState::present(2, "{\"k\": {\"v\": 1}}", 5, 6).unwrap();
        let text = CacheRecord::encode(&state).unwrap();
        assert_eq!(CacheRecord::decode(&text).unwrap(), state);
    }

    #[test]
    fn decode_rejects_missing_terminator() {
        let result = CacheRecord::decode(r#"{"version":7,"createDate":1"#);
        assert!(matches!(result, Err(ParamError::CacheCorrupted(_))));

        let result = CacheRecord::decode("}abc");
        assert!(matches!(result, Err(ParamError::CacheCorrupted(_))));
    }

    #[test]
    fn decode_rejects_present_header_without_dates() {
        let result = CacheRecord::decode(r#"{"version":3}body"#);
        assert!(matches!(result, Err(ParamError::CacheCorrupted(_))));
    }

    #[test]
    fn decode_missing_ignores_trailing_bytes() {
        let state = CacheRecord::decode(r#"{"version":0}leftover"#).unwrap();
        assert_eq!(state, VersionedState::missing());
    }

    #[test]
    fn bootstrap_without_file_is_silent_miss() {
        let dir = tempdir().unwrap();
        let (cache, sink) = cache_in(dir.path());

        assert!(cache.bootstrap().is_none());
        assert!(sink.is_empty());
    }

    #[test]
    fn persist_then_bootstrap() {
        let dir = tempdir().unwrap();
        let (cache, sink) = cache_in(dir.path());
        let state = VersionedState::present(12, "x=1\ny=2\n", 100, 200).unwrap();

        cache.persist(&state);
        assert_eq!(cache.bootstrap(), Some(state));

        cache.persist(&VersionedState::missing());
        assert_eq!(cache.bootstrap(), Some(VersionedState::missing()));
        assert!(sink.is_empty());
    }

    #[test]
    fn truncated_header_warns_once() {
        let dir = tempdir().unwrap();
        let (cache, sink) = cache_in(dir.path());
        fs::write(cache.path(), r#"{"version":7,"creat"#).unwrap();

        assert!(cache.bootstrap().is_none());
        assert_eq!(sink.len(), 1);
        assert!(matches!(
            sink.recorded()[0],
            Diagnostic::CacheHeaderMissing { .. }
        ));
    }

    #[test]
    fn unparsable_header_warns_once() {
        let dir = tempdir().unwrap();
        let (cache, sink) = cache_in(dir.path());
        fs::write(cache.path(), r#"{"version":"seven"}content"#).unwrap();

        assert!(cache.bootstrap().is_none());
        assert_eq!(sink.len(), 1);
        assert!(matches!(
            sink.recorded()[0],
            Diagnostic::CacheHeaderInvalid { .. }
        ));
    }

    #[test]
    fn write_failure_is_reported() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();

        let sink = Arc::new(RecordingSink::new());
        let cache = DiskCache::new(&blocker, "/app/flags", sink.clone());
        cache.persist(&VersionedState::missing());

        assert_eq!(sink.len(), 1);
        assert!(matches!(
            sink.recorded()[0],
            Diagnostic::CacheWriteFailed { .. }
        ));
    }

    #[test]
    fn persist_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let (cache, _sink) = cache_in(dir.path());
        cache.persist(&VersionedState::present(1, "a", 1, 1).unwrap());

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["|app|flags".to_string()]);
    }

    #[test]
    fn sibling_cache_named_like_a_temp_file_survives() {
        let dir = tempdir().unwrap();
        let sink = Arc::new(RecordingSink::new());
        let plain = DiskCache::new(dir.path(), "/a", sink.clone());
        let suffixed = DiskCache::new(dir.path(), "/a.tmp", sink.clone());

        suffixed.persist(&VersionedState::present(9, "nine", 1, 2).unwrap());
        plain.persist(&VersionedState::present(1, "one", 1, 2).unwrap());

        assert_eq!(suffixed.bootstrap().map(|s| s.version()), Some(9));
        assert_eq!(plain.bootstrap().map(|s| s.version()), Some(1));
        assert!(sink.is_empty());
    }

    #[test]
    fn read_record_reports_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nothing");
        assert!(matches!(
            DiskCache::read_record(&missing),
            Err(ParamError::Io(_))
        ));
    }
}
