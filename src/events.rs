use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;

/// File written by the in-app export key.
pub const EXPORT_FILE: &str = "countwatch_export.json";

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        KeyCode::Char('?') => app.toggle_help(),

        // Pull whatever the source has right now instead of waiting for the tick
        KeyCode::Char('r') => {
            if app.reload_data() {
                app.set_status_message("Refreshed".to_string());
            }
        }

        KeyCode::Char('e') => {
            let export_path = PathBuf::from(EXPORT_FILE);
            match app.export_state(&export_path) {
                Ok(()) => {
                    app.set_status_message(format!("Exported to {}", export_path.display()));
                }
                Err(e) => {
                    app.set_status_message(format!("Export failed: {}", e));
                }
            }
        }

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ChannelSource;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_quit_keys() {
        let (_tx, source) = ChannelSource::create("test");
        let mut app = App::new(Box::new(source));
        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.running);

        let (_tx, source) = ChannelSource::create("test");
        let mut app = App::new(Box::new(source));
        handle_key_event(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert!(!app.running);
    }

    #[test]
    fn test_any_key_closes_help() {
        let (_tx, source) = ChannelSource::create("test");
        let mut app = App::new(Box::new(source));

        handle_key_event(&mut app, key(KeyCode::Char('?')));
        assert!(app.show_help);

        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.show_help);
        assert!(app.running);
    }

    #[test]
    fn test_refresh_key_loads_data() {
        let (_tx, source) = ChannelSource::create("test");
        let mut app = App::new(Box::new(source));

        handle_key_event(&mut app, key(KeyCode::Char('r')));
        assert!(app.data.is_some());
        assert_eq!(app.get_status_message(), Some("Refreshed"));
    }

    #[test]
    fn test_export_key_without_data_reports_failure() {
        let (_tx, source) = ChannelSource::create("test");
        let mut app = App::new(Box::new(source));

        handle_key_event(&mut app, key(KeyCode::Char('e')));
        assert!(app
            .get_status_message()
            .is_some_and(|m| m.starts_with("Export failed")));
    }
}
