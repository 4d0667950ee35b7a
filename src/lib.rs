// Library crate: public API items may not be used by the binary
#![allow(unused)]

//! # countwatch
//!
//! A terminal dashboard and library for following a server-side live count.
//!
//! The engine keeps a local copy of the count in sync with a server through
//! two producers: a periodic HTTP poll and a WebSocket push channel that
//! reconnects on its own. Both feed one merge function, so whichever arrives
//! first the dashboard shows the same history.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                            Engine                             │
//! │  ┌──────────┐                                                 │
//! │  │ PollLoop │──┐                                              │
//! │  └──────────┘  │  Update   ┌────────────┐  DashboardSnapshot  │
//! │                ├─────────▶ │ state task │ ──────────────────┐ │
//! │  ┌───────────┐ │  (mpsc)   │  (merge)   │      (watch)      │ │
//! │  │PushChannel│─┘           └────────────┘                   │ │
//! │  └───────────┘                                              │ │
//! └─────────────────────────────────────────────────────────────┼─┘
//!                                                               ▼
//!                      ChannelSource | FileSource ──▶ App ──▶ ui
//! ```
//!
//! - **[`data`]**: Samples, the bounded history window, and derived metrics
//! - **[`sync`]**: The merge function, the connection state machine, and the
//!   two producers with their HTTP/WebSocket transports
//! - **[`engine`]**: Owns the state and both producers; start and stop
//! - **[`source`]**: [`DataSource`] trait feeding the display layer
//! - **[`app`]** and **[`ui`]**: Terminal dashboard using ratatui
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Follow a local server
//! countwatch --url http://localhost:8001 --token "$TOKEN"
//!
//! # Capture the state once and exit
//! countwatch --export snapshot.json
//!
//! # Replay a capture
//! countwatch --file snapshot.json
//! ```
//!
//! ### As a library with an engine
//!
//! ```no_run
//! use countwatch::{App, ChannelSource, DashboardConfig};
//!
//! # tokio_test::block_on(async {
//! let config = DashboardConfig::load(None).unwrap();
//! let engine = config.start_engine().unwrap();
//! let app = App::new(Box::new(ChannelSource::from_engine(&engine)));
//! engine.stop().await;
//! # });
//! ```
//!
//! ### Merging updates directly
//!
//! ```
//! use chrono::Utc;
//! use countwatch::{merge, CountSample, Origin, SyncState, Update};
//!
//! let state = SyncState::new(100);
//! let sample = CountSample::new(Utc::now(), 7);
//! let (state, _) = merge(state, Update::Sample { sample, origin: Origin::Poll });
//! assert_eq!(state.current_count, 7);
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod events;
pub mod source;
pub mod sync;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::DashboardConfig;
pub use data::{CountSample, HistoryWindow};
pub use engine::{Engine, EngineSettings};
pub use error::SyncError;
pub use source::{ChannelSource, DashboardSnapshot, DataSource, FileSource};
pub use sync::{
    merge, ConnectionMachine, ConnectionState, HttpClient, MergeOutcome, Origin, PushConnector,
    SnapshotClient, SyncState, Update, WebSocketConnector,
};
