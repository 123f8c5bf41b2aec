//! HTTP binding of the sync transport.
//!
//! The actual HTTP client is abstracted via a trait so different
//! libraries (reqwest, ureq, a loopback for tests) can provide the
//! wire. The binding builds the pull/push requests of the protocol:
//!
//! ```text
//! GET  <base>/pull?last_pulled_at=<int|0>&schema_version=<int>&turbo=<bool>
//! POST <base>/push?last_pulled_at=<int>
//! ```

use crate::credential::CredentialCell;
use crate::error::{SyncError, SyncResult};
use crate::transport::{PullResponse, SyncTransport};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tidedb_sync_protocol::{PullQuery, PushBody, RemoteDelta};

/// A plain HTTP response: status code plus body bytes.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as lossy UTF-8, used as error detail for non-2xx
    /// responses.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP client abstraction.
///
/// Implementations are blocking and must enforce `timeout` on every
/// request; a timeout is reported like any other transport failure
/// (an `Err`).
pub trait HttpClient: Send + Sync {
    /// Sends a GET request.
    fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, String>;

    /// Sends a POST request with a JSON body.
    fn post(
        &self,
        url: &str,
        body: Vec<u8>,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, String>;
}

/// HTTP-based sync transport.
pub struct HttpTransport<C: HttpClient> {
    base_url: String,
    client: C,
    credential: Arc<CredentialCell>,
    timeout: Duration,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates an HTTP transport for `base_url` (no trailing slash).
    pub fn new(
        base_url: impl Into<String>,
        client: C,
        credential: Arc<CredentialCell>,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            credential,
            timeout,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(auth) = self.credential.authorization_header() {
            headers.push(auth);
        }
        headers
    }
}

impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    fn pull(&self, query: &PullQuery) -> SyncResult<PullResponse> {
        let url = format!("{}/pull?{}", self.base_url, query.to_query_string());
        tracing::debug!(turbo = query.turbo, "sync pull request");

        let response = self
            .client
            .get(&url, &self.headers(), self.timeout)
            .map_err(SyncError::transport_retryable)?;

        if !response.is_success() {
            return Err(SyncError::transport_retryable(response.body_text()));
        }

        if query.turbo {
            // The turbo body is opaque here; the bulk loader owns it.
            return Ok(PullResponse::Turbo(Bytes::from(response.body)));
        }

        let delta = RemoteDelta::from_json(&response.body)?;
        Ok(PullResponse::Incremental(delta))
    }

    fn push(&self, body: &PushBody, last_pulled_at: i64) -> SyncResult<()> {
        let url = format!("{}/push?last_pulled_at={last_pulled_at}", self.base_url);
        let payload = body.to_json()?;
        tracing::debug!(rows = body.len(), "sync push request");

        let response = self
            .client
            .post(&url, payload, &self.headers(), self.timeout)
            .map_err(SyncError::transport_retryable)?;

        if !response.is_success() {
            return Err(SyncError::transport_retryable(response.body_text()));
        }
        Ok(())
    }
}
