//! WebSocket push channel.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::Message;

use super::connection::{PushConnector, PushFrame, PushStream};
use crate::error::SyncError;

/// Default push endpoint.
pub const PUSH_URL: &str = "ws://localhost:8001/ws/live-count";

/// [`PushConnector`] that opens a WebSocket per connection attempt.
///
/// The client never writes to the socket; it only reads text frames.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    token: Option<String>,
    connect_timeout: Duration,
    description: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>, token: Option<String>, connect_timeout: Duration) -> Self {
        let url = url.into();
        let description = format!("push: {}", url);
        Self {
            url,
            token,
            connect_timeout,
            description,
        }
    }
}

#[async_trait]
impl PushConnector for WebSocketConnector {
    async fn connect(&self) -> Result<PushStream, SyncError> {
        let mut request = self.url.as_str().into_client_request()?;
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| SyncError::Transport(format!("invalid token header: {}", e)))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (socket, _response) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| SyncError::Transport("connect timed out".to_string()))??;

        Ok(socket.map(into_frame).boxed())
    }

    fn description(&self) -> &str {
        &self.description
    }
}

fn into_frame(message: Result<Message, tokio_tungstenite::tungstenite::Error>) -> Result<PushFrame, SyncError> {
    match message {
        Ok(Message::Text(text)) => Ok(PushFrame::Text(text.as_str().to_owned())),
        Ok(Message::Close(_)) => Ok(PushFrame::Close),
        Ok(_) => Ok(PushFrame::Other),
        Err(e) => Err(SyncError::from(e)),
    }
}
