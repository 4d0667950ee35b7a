//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::sync::ConnectionState;

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Color for the reconnecting states.
    pub warning: Color,
    /// Color for offline.
    pub critical: Color,
    /// Color for online.
    pub healthy: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Color of chart bars.
    pub bar: Color,
    /// Style for card titles and headings.
    pub header: Style,
    /// Style for the large value inside a card.
    pub value: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::Gray,
            bar: Color::Cyan,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            value: Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::DarkGray,
            bar: Color::Blue,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            value: Style::default().fg(Color::Black).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        // Use terminal-light crate to detect background luminance
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Get style for a push-channel state
    pub fn connection_style(&self, state: ConnectionState) -> Style {
        match state {
            ConnectionState::Open => Style::default().fg(self.healthy),
            ConnectionState::Connecting | ConnectionState::Reconnecting => {
                Style::default().fg(self.warning)
            }
            ConnectionState::Closed | ConnectionState::Disconnected => {
                Style::default().fg(self.critical).add_modifier(Modifier::BOLD)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_style_by_state() {
        let theme = Theme::dark();
        assert_eq!(
            theme.connection_style(ConnectionState::Open).fg,
            Some(Color::Green)
        );
        assert_eq!(
            theme.connection_style(ConnectionState::Reconnecting).fg,
            Some(Color::Yellow)
        );
        assert_eq!(
            theme.connection_style(ConnectionState::Closed).fg,
            Some(Color::Red)
        );
    }
}
