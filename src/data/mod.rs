//! Sample model, history window, and derived metrics.
//!
//! ## Submodules
//!
//! - [`sample`]: [`CountSample`] and payload decoding
//! - [`history`]: [`HistoryWindow`], the bounded, timestamp-ordered retention window
//! - [`metrics`]: peak and average over a window
//! - [`duration`]: Parsing of interval strings (e.g., "5s", "500ms") and age formatting
//!
//! ## Data Flow
//!
//! ```text
//! JSON payload (poll / push / history)
//!        │
//!        ▼
//! CountSample::from_payload()
//!        │
//!        ▼
//! sync::merge() ──▶ HistoryWindow (retention)
//!                         │
//!                         ├──▶ tail(chart_window), default 12
//!                         └──▶ metrics::peak() / metrics::average()
//! ```

pub mod duration;
pub mod history;
pub mod metrics;
pub mod sample;

pub use history::{HistoryWindow, CHART_WINDOW, DEFAULT_RETENTION};
pub use sample::CountSample;
