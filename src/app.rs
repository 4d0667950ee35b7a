//! Application state for the dashboard TUI.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::source::{DashboardSnapshot, DataSource};
use crate::ui::Theme;

/// How long a status message stays visible.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Main application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,

    // Data source
    source: Box<dyn DataSource>,
    pub data: Option<DashboardSnapshot>,
    /// When the display last received a new snapshot.
    pub last_received: Option<Instant>,
    pub load_error: Option<String>,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App reading from the given data source.
    pub fn new(source: Box<dyn DataSource>) -> Self {
        Self {
            running: true,
            show_help: false,
            source,
            data: None,
            last_received: None,
            load_error: None,
            theme: Theme::auto_detect(),
            status_message: None,
        }
    }

    /// Returns a description of the current data source.
    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        match &self.status_message {
            Some((msg, time)) if time.elapsed() < STATUS_MESSAGE_TTL => Some(msg),
            _ => None,
        }
    }

    /// Poll the data source for new data.
    ///
    /// Returns `true` if a new snapshot was received.
    pub fn reload_data(&mut self) -> bool {
        let received = self.source.poll();
        self.load_error = self.source.error().map(str::to_string);

        match received {
            Some(snapshot) => {
                self.data = Some(snapshot);
                self.last_received = Some(Instant::now());
                true
            }
            None => false,
        }
    }

    /// Whether the server is currently reachable over the push channel.
    pub fn is_online(&self) -> bool {
        self.data.as_ref().is_some_and(|d| d.online)
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Write the current snapshot to a JSON file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        let Some(ref data) = self.data else {
            anyhow::bail!("No data to export");
        };
        write_snapshot(data, path)
    }
}

/// Serialize a snapshot as pretty JSON.
pub fn write_snapshot(snapshot: &DashboardSnapshot, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ChannelSource;
    use crate::sync::ConnectionState;

    fn app_with_channel() -> (tokio::sync::watch::Sender<DashboardSnapshot>, App) {
        let (tx, source) = ChannelSource::create("test");
        (tx, App::new(Box::new(source)))
    }

    #[test]
    fn test_reload_data_tracks_new_snapshots() {
        let (tx, mut app) = app_with_channel();
        assert!(app.data.is_none());

        assert!(app.reload_data());
        assert!(app.last_received.is_some());
        assert!(!app.is_online());

        assert!(!app.reload_data());

        tx.send_replace(DashboardSnapshot {
            current_count: 4,
            connection: ConnectionState::Open,
            online: true,
            ..Default::default()
        });
        assert!(app.reload_data());
        assert_eq!(app.data.as_ref().map(|d| d.current_count), Some(4));
        assert!(app.is_online());
    }

    #[test]
    fn test_reload_data_surfaces_source_error() {
        let (tx, mut app) = app_with_channel();
        drop(tx);

        app.reload_data();
        assert_eq!(app.load_error.as_deref(), Some("Engine stopped"));
    }

    #[test]
    fn test_export_without_data_fails() {
        let (_tx, app) = app_with_channel();
        let dir = tempfile::tempdir().unwrap();
        assert!(app.export_state(&dir.path().join("out.json")).is_err());
    }

    #[test]
    fn test_export_writes_snapshot() {
        let (_tx, mut app) = app_with_channel();
        app.reload_data();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        app.export_state(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: DashboardSnapshot = serde_json::from_str(&content).unwrap();
        assert_eq!(Some(parsed), app.data);
    }

    #[test]
    fn test_status_message_and_quit() {
        let (_tx, mut app) = app_with_channel();
        assert!(app.get_status_message().is_none());
        app.set_status_message("Exported".to_string());
        assert_eq!(app.get_status_message(), Some("Exported"));

        app.toggle_help();
        assert!(app.show_help);
        app.quit();
        assert!(!app.running);
    }
}
