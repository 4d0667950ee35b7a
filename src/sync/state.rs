//! The synchronized state and its merge policy.
//!
//! Both producers (poll loop and push channel) may deliver the same
//! observation, race each other, or arrive out of order. [`merge`] is the
//! only way the state changes, and it keeps three guarantees whatever the
//! interleaving:
//!
//! - `history` stays strictly ascending by timestamp with no duplicates
//! - `current_count` never comes from a sample older than the one it
//!   currently reflects
//! - either producer may be absent without affecting the other

use chrono::{DateTime, Utc};

use super::connection::ConnectionState;
use super::{Origin, Update};
use crate::data::{CountSample, HistoryWindow};

/// The authoritative dashboard state.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    pub current_count: u64,
    /// Timestamp of the sample `current_count` was taken from.
    pub current_at: Option<DateTime<Utc>>,
    pub history: HistoryWindow,
    pub connection: ConnectionState,
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new(crate::data::DEFAULT_RETENTION)
    }
}

impl SyncState {
    pub fn new(retention: usize) -> Self {
        Self {
            current_count: 0,
            current_at: None,
            history: HistoryWindow::new(retention),
            connection: ConnectionState::Disconnected,
        }
    }
}

/// What a merge did with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Newer than everything stored; appended and made current.
    Appended,
    /// Same timestamp as the latest entry, pushed: current count refreshed.
    Refreshed,
    /// Same timestamp as the latest entry from a non-push origin: no change.
    Duplicate,
    /// Older than the latest entry: discarded.
    Stale,
    /// History batch applied.
    Backfilled { inserted: usize },
    ConnectionChanged,
}

impl MergeOutcome {
    /// Whether the state visible to the display layer changed.
    pub fn changed(&self) -> bool {
        match self {
            MergeOutcome::Appended | MergeOutcome::Refreshed | MergeOutcome::ConnectionChanged => {
                true
            }
            MergeOutcome::Backfilled { inserted } => *inserted > 0,
            MergeOutcome::Duplicate | MergeOutcome::Stale => false,
        }
    }
}

/// Merge one update into the state.
pub fn merge(mut state: SyncState, update: Update) -> (SyncState, MergeOutcome) {
    let outcome = match update {
        Update::Sample { sample, origin } => merge_sample(&mut state, sample, origin),
        Update::History(batch) => backfill(&mut state, batch),
        Update::Connection(connection) => {
            state.connection = connection;
            MergeOutcome::ConnectionChanged
        }
    };
    (state, outcome)
}

fn merge_sample(state: &mut SyncState, sample: CountSample, origin: Origin) -> MergeOutcome {
    match state.history.latest_timestamp() {
        Some(latest) if sample.timestamp < latest => MergeOutcome::Stale,
        Some(latest) if sample.timestamp == latest => {
            if origin == Origin::Push {
                state.current_count = sample.count;
                MergeOutcome::Refreshed
            } else {
                MergeOutcome::Duplicate
            }
        }
        _ => {
            state.history.push_newest(sample);
            state.current_count = sample.count;
            state.current_at = Some(sample.timestamp);
            MergeOutcome::Appended
        }
    }
}

fn backfill(state: &mut SyncState, mut batch: Vec<CountSample>) -> MergeOutcome {
    batch.sort_by_key(|s| s.timestamp);
    batch.dedup_by_key(|s| s.timestamp);

    let mut inserted = 0;
    for sample in batch {
        let newest = state
            .history
            .latest_timestamp()
            .is_none_or(|latest| sample.timestamp > latest);
        if newest {
            merge_sample(state, sample, Origin::History);
            inserted += 1;
        } else if state.history.insert_sorted(sample) {
            inserted += 1;
        }
    }
    MergeOutcome::Backfilled { inserted }
}
