//! HTTP client for the snapshot and history endpoints.
//!
//! ```text
//! GET {base}/api/count/current  -> { "count": 12, "timestamp": "..." }
//! GET {base}/api/count/history  -> { "history": [ { "timestamp": "...", "count": 9 }, ... ] }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use super::poll::SnapshotClient;
use crate::data::CountSample;
use crate::error::SyncError;

/// Default path of the snapshot endpoint.
pub const SNAPSHOT_PATH: &str = "/api/count/current";

/// Default path of the history endpoint.
pub const HISTORY_PATH: &str = "/api/count/history";

/// [`SnapshotClient`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    snapshot_url: String,
    history_url: String,
    token: Option<String>,
    description: String,
}

impl HttpClient {
    /// Create a builder for configuring the client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    async fn get_json(&self, url: &str) -> Result<Value, SyncError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::from_status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SyncError::MalformedPayload(e.to_string()))
    }
}

#[async_trait]
impl SnapshotClient for HttpClient {
    async fn fetch_current(&self) -> Result<CountSample, SyncError> {
        let body = self.get_json(&self.snapshot_url).await?;
        CountSample::from_payload(&body, Utc::now())
    }

    async fn fetch_history(&self) -> Result<Vec<CountSample>, SyncError> {
        let body = self.get_json(&self.history_url).await?;
        decode_history(&body)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Decode a history response. Entries that fail to decode are skipped.
pub fn decode_history(body: &Value) -> Result<Vec<CountSample>, SyncError> {
    let entries = body
        .get("history")
        .and_then(Value::as_array)
        .ok_or_else(|| SyncError::MalformedPayload("missing history array".to_string()))?;

    let mut samples = Vec::with_capacity(entries.len());
    let mut skipped = 0usize;
    for entry in entries {
        match CountSample::from_history_entry(entry) {
            Ok(sample) => samples.push(sample),
            Err(e) => {
                skipped += 1;
                warn!(error = %e, "Skipping history entry");
            }
        }
    }
    if skipped > 0 {
        warn!(skipped, kept = samples.len(), "History contained malformed entries");
    }
    Ok(samples)
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    base_url: String,
    snapshot_path: String,
    history_path: String,
    token: Option<String>,
    timeout: Duration,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            snapshot_path: SNAPSHOT_PATH.to_string(),
            history_path: HISTORY_PATH.to_string(),
            token: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl HttpClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn snapshot_path(mut self, path: impl Into<String>) -> Self {
        self.snapshot_path = path.into();
        self
    }

    pub fn history_path(mut self, path: impl Into<String>) -> Self {
        self.history_path = path.into();
        self
    }

    /// Bearer credential attached to every request.
    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<HttpClient, SyncError> {
        let client = Client::builder().timeout(self.timeout).build()?;
        let base = self.base_url.trim_end_matches('/');
        Ok(HttpClient {
            client,
            snapshot_url: join_url(base, &self.snapshot_path),
            history_url: join_url(base, &self.history_path),
            token: self.token,
            description: format!("poll: {}", base),
        })
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base, path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned response on a local port. The handle yields the raw
    /// request head.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut chunk = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&chunk[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&head).to_lowercase()
        });
        (format!("http://{}", addr), handle)
    }

    fn client(base_url: &str, token: Option<&str>) -> HttpClient {
        HttpClient::builder()
            .base_url(base_url)
            .token(token.map(str::to_string))
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_current_sends_bearer_token() {
        let (url, server) =
            serve_once("200 OK", r#"{"count": 12, "timestamp": "2024-05-01T12:00:00Z"}"#).await;

        let sample = client(&url, Some("t")).fetch_current().await.unwrap();
        assert_eq!(sample.count, 12);

        let head = server.await.unwrap();
        assert!(head.starts_with("get /api/count/current "));
        assert!(head.contains("authorization: bearer t\r\n"));
    }

    #[tokio::test]
    async fn test_no_token_sends_no_authorization() {
        let (url, server) = serve_once("200 OK", r#"{"count": 1}"#).await;

        client(&url, None).fetch_current().await.unwrap();
        assert!(!server.await.unwrap().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_rejected() {
        let (url, _server) = serve_once("401 Unauthorized", "{}").await;
        let err = client(&url, Some("expired")).fetch_current().await.unwrap_err();
        assert_eq!(err, SyncError::AuthRejected(401));
        assert!(err.is_transport());

        let (url, server) = serve_once("403 Forbidden", "{}").await;
        let err = client(&url, Some("t")).fetch_history().await.unwrap_err();
        assert_eq!(err, SyncError::AuthRejected(403));
        assert!(server.await.unwrap().starts_with("get /api/count/history "));
    }

    #[tokio::test]
    async fn test_server_error_and_bad_body() {
        let (url, _server) = serve_once("500 Internal Server Error", "{}").await;
        assert_eq!(
            client(&url, None).fetch_current().await.unwrap_err(),
            SyncError::Status(500)
        );

        let (url, _server) = serve_once("200 OK", "not json").await;
        assert!(matches!(
            client(&url, None).fetch_current().await.unwrap_err(),
            SyncError::MalformedPayload(_)
        ));
    }

    #[test]
    fn test_decode_history_skips_malformed_entries() {
        let body = json!({
            "history": [
                {"timestamp": "2024-05-01T12:00:10", "count": 4, "zone_id": "default"},
                {"timestamp": "2024-05-01T12:00:05", "count": -1},
                {"count": 2},
                {"timestamp": "2024-05-01T12:00:00", "count": 3}
            ]
        });
        let samples = decode_history(&body).unwrap();
        let counts: Vec<u64> = samples.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![4, 3]);
    }

    #[test]
    fn test_decode_history_requires_array() {
        assert!(decode_history(&json!({"items": []})).is_err());
        assert!(decode_history(&json!({"history": []})).unwrap().is_empty());
    }

    #[test]
    fn test_builder_joins_urls() {
        let client = HttpClient::builder()
            .base_url("http://counter.local:8001/")
            .snapshot_path("api/count/current")
            .build()
            .unwrap();
        assert_eq!(client.snapshot_url, "http://counter.local:8001/api/count/current");
        assert_eq!(client.history_url, "http://counter.local:8001/api/count/history");
        assert_eq!(client.description(), "poll: http://counter.local:8001");
    }
}
