//! The read-only view the display layer consumes.
//!
//! This is also the export format: `countwatch --export` and the TUI's export
//! key write it as JSON, and [`FileSource`](super::FileSource) reads it back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{metrics, CountSample};
use crate::sync::{ConnectionState, SyncState};

/// A copy of the synchronized state with derived metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub current_count: u64,
    /// Peak over the retained window.
    pub peak: u64,
    /// Rounded mean over the retained window.
    pub average: u64,
    pub connection: ConnectionState,
    pub online: bool,
    /// Timestamp of the sample behind `current_count`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Number of samples the engine holds.
    pub retained: usize,
    /// The chart view, ascending.
    pub history: Vec<CountSample>,
}

impl DashboardSnapshot {
    pub fn from_state(state: &SyncState, chart_window: usize) -> Self {
        Self {
            current_count: state.current_count,
            peak: metrics::peak(state.history.iter()),
            average: metrics::average(state.history.iter()),
            connection: state.connection,
            online: state.connection.is_online(),
            updated_at: state.current_at,
            retained: state.history.len(),
            history: state.history.tail(chart_window),
        }
    }

    /// Whether any sample has been received.
    pub fn has_data(&self) -> bool {
        self.updated_at.is_some()
    }
}
