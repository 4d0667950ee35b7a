//! Bounded, timestamp-ordered sample history for charting and metrics.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::sample::CountSample;

/// Default number of samples kept for metric computation.
pub const DEFAULT_RETENTION: usize = 100;

/// Number of samples shown on the chart.
pub const CHART_WINDOW: usize = 12;

/// Samples ordered strictly ascending by timestamp, with no two sharing a
/// timestamp, capped at `retention` entries (oldest dropped first).
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryWindow {
    samples: VecDeque<CountSample>,
    retention: usize,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl HistoryWindow {
    /// Create an empty window. A retention of zero is treated as one.
    pub fn new(retention: usize) -> Self {
        let retention = retention.max(1);
        Self {
            samples: VecDeque::with_capacity(retention),
            retention,
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The most recent sample.
    pub fn latest(&self) -> Option<&CountSample> {
        self.samples.back()
    }

    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.latest().map(|s| s.timestamp)
    }

    pub fn contains_timestamp(&self, timestamp: DateTime<Utc>) -> bool {
        self.samples
            .binary_search_by(|s| s.timestamp.cmp(&timestamp))
            .is_ok()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &CountSample> + ExactSizeIterator {
        self.samples.iter()
    }

    /// Append a sample newer than every stored one.
    ///
    /// Returns false (and stores nothing) if the sample is not strictly newer
    /// than the latest entry.
    pub fn push_newest(&mut self, sample: CountSample) -> bool {
        if self
            .latest_timestamp()
            .is_some_and(|latest| sample.timestamp <= latest)
        {
            return false;
        }
        self.samples.push_back(sample);
        self.trim();
        true
    }

    /// Insert a sample at its sorted position.
    ///
    /// Returns false if a sample with the same timestamp is already stored,
    /// or if the sample would be the oldest entry of a full window.
    pub fn insert_sorted(&mut self, sample: CountSample) -> bool {
        match self
            .samples
            .binary_search_by(|s| s.timestamp.cmp(&sample.timestamp))
        {
            Ok(_) => false,
            Err(0) if self.samples.len() >= self.retention => false,
            Err(index) => {
                self.samples.insert(index, sample);
                self.trim();
                true
            }
        }
    }

    /// The most recent `n` samples, ascending.
    pub fn tail(&self, n: usize) -> Vec<CountSample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).copied().collect()
    }

    fn trim(&mut self) {
        while self.samples.len() > self.retention {
            self.samples.pop_front();
        }
    }
}
