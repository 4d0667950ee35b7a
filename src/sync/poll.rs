//! Periodic snapshot polling.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Origin, Update};
use crate::data::CountSample;
use crate::error::SyncError;

/// Default cadence of snapshot requests.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Request/response access to the count endpoints.
#[async_trait]
pub trait SnapshotClient: Send + Sync + Debug {
    /// Fetch the current count.
    async fn fetch_current(&self) -> Result<CountSample, SyncError>;

    /// Fetch the server's stored history, in any order.
    async fn fetch_history(&self) -> Result<Vec<CountSample>, SyncError>;

    /// Human-readable endpoint description.
    fn description(&self) -> &str;
}

/// Polls the snapshot endpoint on a fixed cadence and fetches history once.
///
/// Each tick spawns its request so a slow response never delays the timer.
/// At most one snapshot request is in flight; a tick that finds the previous
/// request still running is skipped.
#[derive(Debug)]
pub struct PollLoop {
    client: Arc<dyn SnapshotClient>,
    interval: Duration,
    updates: mpsc::Sender<Update>,
    cancel: CancellationToken,
}

impl PollLoop {
    pub fn new(
        client: Arc<dyn SnapshotClient>,
        interval: Duration,
        updates: mpsc::Sender<Update>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            interval: interval.max(Duration::from_millis(1)),
            updates,
            cancel,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        let history = tokio::spawn(fetch_history(
            Arc::clone(&self.client),
            self.updates.clone(),
        ));

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight: Option<JoinHandle<()>> = None;
        let mut tick: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    tick += 1;
                    if in_flight.as_ref().is_some_and(|h| !h.is_finished()) {
                        debug!(tick, "Snapshot request still in flight, skipping tick");
                        continue;
                    }
                    in_flight = Some(tokio::spawn(fetch_snapshot(
                        Arc::clone(&self.client),
                        self.updates.clone(),
                        tick,
                    )));
                }
            }
        }

        history.abort();
        if let Some(handle) = in_flight {
            handle.abort();
        }
        info!(endpoint = self.client.description(), ticks = tick, "Poll loop stopped");
    }
}

async fn fetch_snapshot(client: Arc<dyn SnapshotClient>, updates: mpsc::Sender<Update>, tick: u64) {
    match client.fetch_current().await {
        Ok(sample) => {
            let update = Update::Sample {
                sample,
                origin: Origin::Poll,
            };
            if updates.send(update).await.is_err() {
                debug!(tick, "Engine gone, dropping poll result");
            }
        }
        Err(SyncError::AuthRejected(status)) => {
            warn!(tick, status, "Snapshot poll rejected credentials");
        }
        Err(e) => warn!(tick, error = %e, "Snapshot poll failed"),
    }
}

async fn fetch_history(client: Arc<dyn SnapshotClient>, updates: mpsc::Sender<Update>) {
    match client.fetch_history().await {
        Ok(batch) => {
            info!(samples = batch.len(), "History fetched");
            let _ = updates.send(Update::History(batch)).await;
        }
        Err(e) => warn!(error = %e, "History fetch failed"),
    }
}
