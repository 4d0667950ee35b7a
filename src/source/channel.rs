//! Channel-based data source.
//!
//! Receives dashboard snapshots via a tokio watch channel, which is how a
//! running [`Engine`](crate::engine::Engine) publishes its state.

use tokio::sync::watch;

use super::{DashboardSnapshot, DataSource};
use crate::engine::Engine;

/// A data source that receives snapshots via a watch channel.
///
/// # Example
///
/// ```
/// use countwatch::{ChannelSource, DataSource};
///
/// let (tx, mut source) = ChannelSource::create("test");
/// assert!(source.poll().is_some());
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: watch::Receiver<DashboardSnapshot>,
    description: String,
    /// Track if we've returned the initial value yet
    initial_returned: bool,
    last_error: Option<String>,
}

impl ChannelSource {
    pub fn new(receiver: watch::Receiver<DashboardSnapshot>, source_description: &str) -> Self {
        Self {
            receiver,
            description: source_description.to_string(),
            initial_returned: false,
            last_error: None,
        }
    }

    /// Subscribe to a running engine.
    pub fn from_engine(engine: &Engine) -> Self {
        Self::new(engine.subscribe(), engine.description())
    }

    /// Create a channel pair for sending snapshots to a ChannelSource.
    pub fn create(source_description: &str) -> (watch::Sender<DashboardSnapshot>, Self) {
        let (tx, rx) = watch::channel(DashboardSnapshot::default());
        (tx, Self::new(rx, source_description))
    }
}

impl DataSource for ChannelSource {
    fn poll(&mut self) -> Option<DashboardSnapshot> {
        // Return the initial value on first poll
        if !self.initial_returned {
            self.initial_returned = true;
            self.receiver.mark_changed();
        }

        match self.receiver.has_changed() {
            Ok(true) => Some(self.receiver.borrow_and_update().clone()),
            Ok(false) => None,
            Err(_) if self.last_error.is_none() => {
                // Sender gone: hand out the final value once.
                self.last_error = Some("Engine stopped".to_string());
                Some(self.receiver.borrow_and_update().clone())
            }
            Err(_) => None,
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
