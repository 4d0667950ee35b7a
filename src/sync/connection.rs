//! Push channel lifecycle.
//!
//! [`ConnectionMachine`] is the pure state machine; [`PushChannel`] drives it
//! against a [`PushConnector`] and forwards decoded samples to the engine.
//!
//! ```text
//!  Disconnected ──start──▶ Connecting ──opened──▶ Open
//!                             ▲   │                 │
//!                  reconnect  │   └──────closed─────┤
//!                    due      │                     ▼
//!                       Reconnecting ◀──armed──── Closed
//! ```
//!
//! `stop` moves any state to `Disconnected` and releases the channel.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Origin, Update};
use crate::data::CountSample;
use crate::error::SyncError;

/// Delay between a close and the next connection attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Lifecycle state of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Closed,
    Reconnecting,
}

impl ConnectionState {
    /// Only an open channel counts as online.
    pub fn is_online(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

/// Lifecycle events that drive the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Start,
    Opened,
    /// Channel closed or failed, including a failed connection attempt.
    Closed,
    /// The reconnect timer has been armed.
    TimerArmed,
    ReconnectDue,
    Stop,
}

/// Side effect the driver must carry out after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Connect,
    ScheduleReconnect(Duration),
    Release,
}

/// How the machine recovers from a closed channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    /// Give up after this many consecutive attempts that never opened.
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: RECONNECT_DELAY,
            max_attempts: None,
        }
    }
}

/// Pure connection state machine. Performs no I/O.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    policy: ReconnectPolicy,
    failed_attempts: u32,
}

impl ConnectionMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            policy,
            failed_attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consecutive attempts that failed before reaching `Open`.
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Apply an event. Events that are not valid in the current state are
    /// ignored and produce no effect.
    pub fn handle(&mut self, event: ConnectionEvent) -> Option<Effect> {
        use ConnectionEvent as E;
        use ConnectionState as S;

        match (self.state, event) {
            (S::Disconnected, E::Start) => {
                self.state = S::Connecting;
                Some(Effect::Connect)
            }
            (S::Connecting, E::Opened) => {
                self.state = S::Open;
                self.failed_attempts = 0;
                None
            }
            (S::Connecting | S::Open, E::Closed) => {
                if self.state == S::Connecting {
                    self.failed_attempts = self.failed_attempts.saturating_add(1);
                }
                self.state = S::Closed;
                match self.policy.max_attempts {
                    Some(max) if self.failed_attempts >= max => {
                        warn!(
                            attempts = self.failed_attempts,
                            "Push channel reconnect limit reached, giving up"
                        );
                        None
                    }
                    _ => Some(Effect::ScheduleReconnect(self.policy.delay)),
                }
            }
            (S::Closed, E::TimerArmed) => {
                self.state = S::Reconnecting;
                None
            }
            (S::Reconnecting, E::ReconnectDue) => {
                self.state = S::Connecting;
                Some(Effect::Connect)
            }
            (_, E::Stop) => {
                self.state = S::Disconnected;
                Some(Effect::Release)
            }
            (state, event) => {
                debug!(state = state.label(), ?event, "Ignoring connection event");
                None
            }
        }
    }
}

/// A frame received on the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushFrame {
    Text(String),
    /// The server closed the channel.
    Close,
    /// Control or binary frames; ignored.
    Other,
}

/// Stream of frames for one live connection. Dropping it releases the
/// connection.
pub type PushStream = BoxStream<'static, Result<PushFrame, SyncError>>;

/// Opens push channel connections.
#[async_trait]
pub trait PushConnector: Send + Sync + Debug {
    /// Establish a new connection.
    async fn connect(&self) -> Result<PushStream, SyncError>;

    /// Human-readable endpoint description.
    fn description(&self) -> &str;
}

/// Drives a [`ConnectionMachine`] against a connector, holding at most one
/// live connection at a time.
#[derive(Debug)]
pub struct PushChannel {
    connector: Arc<dyn PushConnector>,
    machine: ConnectionMachine,
    updates: mpsc::Sender<Update>,
    cancel: CancellationToken,
}

impl PushChannel {
    pub fn new(
        connector: Arc<dyn PushConnector>,
        policy: ReconnectPolicy,
        updates: mpsc::Sender<Update>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connector,
            machine: ConnectionMachine::new(policy),
            updates,
            cancel,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until cancelled, or until the reconnect policy gives up.
    pub async fn run(mut self) {
        let mut effect = self.transition(ConnectionEvent::Start).await;

        while !self.cancel.is_cancelled() {
            match effect {
                Some(Effect::Connect) => {
                    effect = self.connect_and_read().await;
                }
                Some(Effect::ScheduleReconnect(delay)) => {
                    self.transition(ConnectionEvent::TimerArmed).await;
                    debug!(delay_ms = delay.as_millis() as u64, "Reconnect scheduled");
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    effect = self.transition(ConnectionEvent::ReconnectDue).await;
                }
                Some(Effect::Release) | None => break,
            }
        }

        if self.cancel.is_cancelled() {
            self.transition(ConnectionEvent::Stop).await;
            info!(endpoint = self.connector.description(), "Push channel stopped");
        }
    }

    /// One connection attempt, reading until the channel closes. Returns the
    /// effect of the resulting `Closed` transition, or `None` on cancel.
    async fn connect_and_read(&mut self) -> Option<Effect> {
        let connector = Arc::clone(&self.connector);
        let attempt = tokio::select! {
            _ = self.cancel.cancelled() => return None,
            attempt = connector.connect() => attempt,
        };

        let mut stream = match attempt {
            Ok(stream) => stream,
            Err(e) => {
                warn!(endpoint = connector.description(), error = %e, "Push channel connect failed");
                return self.transition(ConnectionEvent::Closed).await;
            }
        };

        self.transition(ConnectionEvent::Opened).await;
        info!(endpoint = connector.description(), "Push channel open");

        let reason = loop {
            let frame = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                frame = stream.next() => frame,
            };
            match frame {
                Some(Ok(PushFrame::Text(text))) => self.forward(&text).await,
                Some(Ok(PushFrame::Other)) => {}
                Some(Ok(PushFrame::Close)) => break "closed by server".to_string(),
                Some(Err(e)) => break e.to_string(),
                None => break "stream ended".to_string(),
            }
        };

        // Release the old connection before any reconnect can start.
        drop(stream);
        info!(endpoint = connector.description(), %reason, "Push channel closed");
        self.transition(ConnectionEvent::Closed).await
    }

    async fn forward(&self, text: &str) {
        match CountSample::from_frame(text, Utc::now()) {
            Ok(sample) => {
                let update = Update::Sample {
                    sample,
                    origin: Origin::Push,
                };
                if self.updates.send(update).await.is_err() {
                    debug!("Engine gone, dropping push sample");
                }
            }
            Err(e) => warn!(error = %e, "Discarding push frame"),
        }
    }

    async fn transition(&mut self, event: ConnectionEvent) -> Option<Effect> {
        let before = self.machine.state();
        let effect = self.machine.handle(event);
        let after = self.machine.state();
        if before != after {
            debug!(from = before.label(), to = after.label(), "Connection state changed");
            let _ = self.updates.send(Update::Connection(after)).await;
        }
        effect
    }
}
