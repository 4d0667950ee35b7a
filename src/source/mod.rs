//! Data source abstraction for the display layer.
//!
//! The TUI reads [`DashboardSnapshot`]s through the [`DataSource`] trait, so
//! it renders the same way whether the data comes from a live engine or from
//! an exported file.

mod channel;
mod file;
mod snapshot;

pub use channel::ChannelSource;
pub use file::FileSource;
pub use snapshot::DashboardSnapshot;

use std::fmt::Debug;

/// Trait for receiving dashboard snapshots from various sources.
///
/// # Example
///
/// ```
/// use countwatch::{DataSource, FileSource};
///
/// let mut source = FileSource::new("countwatch_export.json");
/// if let Some(snapshot) = source.poll() {
///     println!("Current count: {}", snapshot.current_count);
/// }
/// ```
pub trait DataSource: Send + Debug {
    /// Poll for the latest snapshot.
    ///
    /// Returns `Some(snapshot)` if new data is available, `None` otherwise.
    /// This method must not block.
    fn poll(&mut self) -> Option<DashboardSnapshot>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the TUI header.
    fn description(&self) -> &str;

    /// The error from the last poll, if any.
    fn error(&self) -> Option<&str>;
}
