//! Engine lifecycle: owns the synchronized state and both producers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::data::{CHART_WINDOW, DEFAULT_RETENTION};
use crate::source::DashboardSnapshot;
use crate::sync::{
    merge, ConnectionState, PollLoop, PushChannel, PushConnector, ReconnectPolicy,
    SnapshotClient, SyncState, Update, POLL_INTERVAL,
};

/// Capacity of the producer-to-state channel.
const UPDATE_BUFFER: usize = 64;

/// Tunables for a running engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub poll_interval: Duration,
    pub reconnect: ReconnectPolicy,
    /// Samples kept for metrics.
    pub retention: usize,
    /// Samples shown on the chart.
    pub chart_window: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            reconnect: ReconnectPolicy::default(),
            retention: DEFAULT_RETENTION,
            chart_window: CHART_WINDOW,
        }
    }
}

/// A running synchronization engine.
///
/// Starting the engine spawns three tasks on the current tokio runtime: the
/// state task (sole owner of [`SyncState`]), the poll loop, and the push
/// channel. Readers get copies of the state through [`Engine::subscribe`].
///
/// [`Engine::stop`] cancels everything and waits for the tasks to finish.
/// Dropping the engine cancels too, without waiting.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use countwatch::engine::{Engine, EngineSettings};
/// use countwatch::sync::{HttpClient, WebSocketConnector};
///
/// # tokio_test::block_on(async {
/// let client = HttpClient::builder().base_url("http://localhost:8001").build().unwrap();
/// let connector = WebSocketConnector::new(
///     "ws://localhost:8001/ws/live-count",
///     None,
///     Duration::from_secs(10),
/// );
///
/// let engine = Engine::start(EngineSettings::default(), Arc::new(client), Arc::new(connector));
/// let mut snapshots = engine.subscribe();
/// snapshots.changed().await.unwrap();
/// println!("current count: {}", snapshots.borrow().current_count);
/// engine.stop().await;
/// # });
/// ```
#[derive(Debug)]
pub struct Engine {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    snapshots: watch::Receiver<DashboardSnapshot>,
    description: String,
}

impl Engine {
    /// Start the engine. Must be called from within a tokio runtime.
    pub fn start(
        settings: EngineSettings,
        client: Arc<dyn SnapshotClient>,
        connector: Arc<dyn PushConnector>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (update_tx, update_rx) = mpsc::channel(UPDATE_BUFFER);

        let state = SyncState::new(settings.retention);
        let (snapshot_tx, snapshot_rx) =
            watch::channel(DashboardSnapshot::from_state(&state, settings.chart_window));

        let description = format!("{} + {}", client.description(), connector.description());
        info!(
            poll_ms = settings.poll_interval.as_millis() as u64,
            reconnect_ms = settings.reconnect.delay.as_millis() as u64,
            retention = settings.retention,
            "Starting engine ({})",
            description
        );

        let state_task = tokio::spawn(run_state(
            state,
            update_rx,
            snapshot_tx,
            settings.chart_window,
            cancel.clone(),
        ));
        let poll_task = PollLoop::new(
            client,
            settings.poll_interval,
            update_tx.clone(),
            cancel.child_token(),
        )
        .spawn();
        let push_task =
            PushChannel::new(connector, settings.reconnect, update_tx, cancel.child_token())
                .spawn();

        Self {
            cancel,
            tasks: vec![state_task, poll_task, push_task],
            snapshots: snapshot_rx,
            description,
        }
    }

    /// A receiver that is notified whenever the visible state changes.
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.clone()
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Endpoints this engine talks to.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Cancel the poll timer and push channel and wait for all tasks.
    ///
    /// No merge happens once this is called, even for responses already in
    /// flight.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!(error = %e, "Engine task panicked");
                }
            }
        }
        info!("Engine stopped");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_state(
    mut state: SyncState,
    mut updates: mpsc::Receiver<Update>,
    snapshots: watch::Sender<DashboardSnapshot>,
    chart_window: usize,
    cancel: CancellationToken,
) {
    loop {
        let update = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            update = updates.recv() => match update {
                Some(update) => update,
                None => break,
            },
        };

        let (next, outcome) = merge(state, update);
        state = next;
        trace!(?outcome, "Merged update");

        if outcome.changed() {
            snapshots.send_replace(DashboardSnapshot::from_state(&state, chart_window));
        }
    }

    // Readers keep the last values but must not see the channel as live.
    // Nothing is merged after teardown.
    updates.close();
    state.connection = ConnectionState::Disconnected;
    snapshots.send_replace(DashboardSnapshot::from_state(&state, chart_window));
    debug!("State task stopped");
}
