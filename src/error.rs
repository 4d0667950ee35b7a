//! Error types for the synchronization engine.

use thiserror::Error;

/// Errors produced while fetching, receiving, or decoding count samples.
///
/// None of these are fatal to the engine: decode failures are discarded,
/// transport failures are retried on the next poll tick or reconnect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// A payload could not be turned into a count sample.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Network or channel level failure.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The server rejected our credential.
    #[error("Authentication rejected (HTTP {0})")]
    AuthRejected(u16),

    /// Any other non-success response.
    #[error("Server returned status {0}")]
    Status(u16),
}

impl SyncError {
    /// Whether this failure belongs to the transport class and should be
    /// retried on the channel's normal schedule.
    pub fn is_transport(&self) -> bool {
        !matches!(self, SyncError::MalformedPayload(_))
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => SyncError::AuthRejected(status),
            _ => SyncError::Status(status),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return SyncError::MalformedPayload(err.to_string());
        }
        match err.status() {
            Some(status) => SyncError::from_status(status.as_u16()),
            None => SyncError::Transport(err.to_string()),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match err {
            WsError::Http(response) => SyncError::from_status(response.status().as_u16()),
            other => SyncError::Transport(other.to_string()),
        }
    }
}
