//! The synchronization engine's producers and merge policy.
//!
//! Two producers feed one store:
//!
//! ```text
//! ┌────────────┐  Update::Sample(Poll)   ┌──────────────┐
//! │  PollLoop  │────Update::History─────▶│              │
//! └────────────┘                         │ state task   │──▶ watch::Sender<DashboardSnapshot>
//! ┌────────────┐  Update::Sample(Push)   │  (merge)     │
//! │PushChannel │──Update::Connection────▶│              │
//! └────────────┘                         └──────────────┘
//! ```
//!
//! - [`connection`]: push channel state machine and its async driver
//! - [`poll`]: the fixed-cadence poll loop
//! - [`state`]: [`SyncState`] and the pure [`merge`] function
//! - [`http`], [`websocket`]: network implementations of the producer traits

pub mod connection;
pub mod http;
pub mod poll;
pub mod state;
pub mod websocket;

pub use connection::{
    ConnectionEvent, ConnectionMachine, ConnectionState, Effect, PushChannel, PushConnector,
    PushFrame, PushStream, ReconnectPolicy, RECONNECT_DELAY,
};
pub use http::HttpClient;
pub use poll::{PollLoop, SnapshotClient, POLL_INTERVAL};
pub use state::{merge, MergeOutcome, SyncState};
pub use websocket::WebSocketConnector;

use crate::data::CountSample;

/// Which producer delivered a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Poll,
    Push,
    History,
}

/// A message from a producer to the state task.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Sample { sample: CountSample, origin: Origin },
    History(Vec<CountSample>),
    Connection(ConnectionState),
}
