//! In-memory producers for driving the engine without a network.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::Instant;

use countwatch::sync::{PushConnector, PushFrame, PushStream, SnapshotClient};
use countwatch::{CountSample, SyncError};

/// Sender half of a scripted push connection. Dropping it ends the stream.
pub type FrameSender = mpsc::UnboundedSender<Result<PushFrame, SyncError>>;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

pub fn sample(secs: i64, count: u64) -> CountSample {
    CountSample::new(at(secs), count)
}

/// A push frame as the server would send it.
pub fn frame(secs: i64, count: u64) -> PushFrame {
    PushFrame::Text(format!(
        r#"{{"count": {}, "timestamp": "{}"}}"#,
        count,
        at(secs).to_rfc3339()
    ))
}

/// Answers snapshot requests from a script and records when each was made.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<CountSample, SyncError>>>,
    history: Mutex<Option<Result<Vec<CountSample>, SyncError>>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: Result<CountSample, SyncError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn with_history(self, history: Result<Vec<CountSample>, SyncError>) -> Self {
        *self.history.lock().unwrap() = Some(history);
        self
    }

    /// Every snapshot response takes this long.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotClient for ScriptedClient {
    async fn fetch_current(&self) -> Result<CountSample, SyncError> {
        self.calls.lock().unwrap().push(Instant::now());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(SyncError::Transport("script exhausted".to_string())))
    }

    async fn fetch_history(&self) -> Result<Vec<CountSample>, SyncError> {
        let history = self.history.lock().unwrap().take();
        history.unwrap_or_else(|| Ok(Vec::new()))
    }

    fn description(&self) -> &str {
        "poll: scripted"
    }
}

enum Attempt {
    Fail(SyncError),
    Open(mpsc::UnboundedReceiver<Result<PushFrame, SyncError>>),
}

/// Hands out scripted connections in order. Once the script runs out,
/// `connect` never completes.
#[derive(Default)]
pub struct ScriptedConnector {
    attempts: Mutex<VecDeque<Attempt>>,
    connects: Mutex<Vec<Instant>>,
}

impl std::fmt::Debug for ScriptedConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedConnector")
            .field("connects", &self.connects.lock().unwrap().len())
            .finish()
    }
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a connection that succeeds; frames are fed through the sender.
    pub fn open(&self) -> FrameSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.attempts.lock().unwrap().push_back(Attempt::Open(rx));
        tx
    }

    /// Queue a connection attempt that fails.
    pub fn fail(&self, error: SyncError) {
        self.attempts.lock().unwrap().push_back(Attempt::Fail(error));
    }

    /// When each `connect` call happened.
    pub fn connects(&self) -> Vec<Instant> {
        self.connects.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushConnector for ScriptedConnector {
    async fn connect(&self) -> Result<PushStream, SyncError> {
        self.connects.lock().unwrap().push(Instant::now());
        let next = self.attempts.lock().unwrap().pop_front();
        match next {
            Some(Attempt::Fail(error)) => Err(error),
            Some(Attempt::Open(rx)) => Ok(futures_util::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed()),
            None => std::future::pending().await,
        }
    }

    fn description(&self) -> &str {
        "push: scripted"
    }
}

/// Wait for `cond`, polling on the (possibly paused) tokio clock.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(60), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}
