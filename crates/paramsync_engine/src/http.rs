//! HTTP transport implementation.
//!
//! This module turns a `getFile` call into a JSON POST. The actual HTTP
//! client is abstracted via a trait so the embedding application chooses
//! the library, TLS setup and credentials.

use crate::error::{ParamError, ParamResult};
use crate::transport::ParameterTransport;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Endpoint for fetching a parameter file.
pub const GET_FILE_ENDPOINT: &str = "/getFile";

/// HTTP client abstraction.
///
/// Implementations must allow a request to stay open for at least the
/// long-poll wait plus some margin.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request with a JSON body and returns the response body.
    fn post_json(&self, url: &str, body: String) -> Result<String, String>;

    /// Checks if the client is connected/healthy.
    fn is_healthy(&self) -> bool;
}

/// Body of a `getFile` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFileRequest<'a> {
    /// Path of the file on the server.
    pub path: &'a str,
    /// Version the caller already holds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
    /// How long the server may hold the request.
    pub max_wait_seconds: u64,
}

/// HTTP-based parameter transport.
pub struct HttpTransport<C: HttpClient> {
    /// Base URL of the parameter server (e.g., "https://params.example.com").
    base_url: String,
    /// HTTP client implementation.
    client: C,
    /// Connection state.
    connected: AtomicBool,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            connected: AtomicBool::new(true),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Checks if the transport is usable.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }

    /// Closes the transport; later calls fail with [`ParamError::NotConnected`].
    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl<C: HttpClient> ParameterTransport for HttpTransport<C> {
    fn get_file(
        &self,
        path: &str,
        expected_version: Option<u64>,
        max_wait: Duration,
    ) -> ParamResult<String> {
        if !self.is_connected() {
            return Err(ParamError::NotConnected);
        }

        let request = GetFileRequest {
            path,
            expected_version,
            max_wait_seconds: max_wait.as_secs(),
        };
        let body = serde_json::to_string(&request)?;

        let url = format!("{}{}", self.base_url, GET_FILE_ENDPOINT);
        self.client
            .post_json(&url, body)
            .map_err(ParamError::transport_retryable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct TestClient {
        response: Mutex<Result<String, String>>,
        last_request: Mutex<Option<(String, String)>>,
        healthy: AtomicBool,
    }

    impl TestClient {
        fn new() -> Self {
            Self {
                response: Mutex::new(Err("no response set".into())),
                last_request: Mutex::new(None),
                healthy: AtomicBool::new(true),
            }
        }

        fn set_response(&self, resp: Result<String, String>) {
            *self.response.lock() = resp;
        }

        fn set_healthy(&self, healthy: bool) {
            self.healthy.store(healthy, Ordering::SeqCst);
        }
    }

    impl HttpClient for TestClient {
        fn post_json(&self, url: &str, body: String) -> Result<String, String> {
            *self.last_request.lock() = Some((url.to_string(), body));
            self.response.lock().clone()
        }

        fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn transport_creation() {
        let transport = HttpTransport::new("https://params.example.com/", TestClient::new());
        assert_eq!(transport.base_url(), "https://params.example.com");
        assert!(transport.is_connected());
    }

    #[test]
    fn request_body_and_url() {
        let client = TestClient::new();
        client.set_response(Ok(r#"{"status":"success/unchanged"}"#.into()));
        let transport = HttpTransport::new("https://params.example.com", client);

        let body = transport
            .get_file("/app/flags", Some(4), Duration::from_secs(30))
            .unwrap();
        assert_eq!(body, r#"{"status":"success/unchanged"}"#);

        let (url, sent) = transport.client.last_request.lock().clone().unwrap();
        assert_eq!(url, "https://params.example.com/getFile");
        assert_eq!(
            sent,
            r#"{"path":"/app/flags","expectedVersion":4,"maxWaitSeconds":30}"#
        );
    }

    #[test]
    fn first_request_omits_expected_version() {
        let client = TestClient::new();
        client.set_response(Ok("{}".into()));
        let transport = HttpTransport::new("http://localhost", client);

        transport
            .get_file("/p", None, Duration::from_secs(30))
            .unwrap();
        let (_, sent) = transport.client.last_request.lock().clone().unwrap();
        assert_eq!(sent, r#"{"path":"/p","maxWaitSeconds":30}"#);
    }

    #[test]
    fn client_failure_is_retryable() {
        let transport = HttpTransport::new("http://localhost", TestClient::new());
        let err = transport
            .get_file("/p", None, Duration::from_secs(1))
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn closed_or_unhealthy_transport() {
        let client = TestClient::new();
        client.set_healthy(false);
        let transport = HttpTransport::new("http://localhost", client);
        assert!(!transport.is_connected());

        let transport = HttpTransport::new("http://localhost", TestClient::new());
        transport.close();
        let result = transport.get_file("/p", None, Duration::from_secs(1));
        assert!(matches!(result, Err(ParamError::NotConnected)));
    }
}
