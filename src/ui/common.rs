//! Common UI components.
//!
//! This module contains the header bar, status bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::duration::format_age;

/// Render the header bar with the online indicator.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let title = Span::styled(" COUNTWATCH ", Style::default().add_modifier(Modifier::BOLD));

    let Some(ref data) = app.data else {
        let line = Line::from(vec![title, Span::raw("| Loading...")]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    };

    let (indicator, label) = if data.online {
        ("●", "online")
    } else {
        ("○", "offline")
    };
    let style = app.theme.connection_style(data.connection);

    let line = Line::from(vec![
        Span::styled(format!(" {} ", indicator), style),
        title,
        Span::raw("│ "),
        Span::styled(label, style.add_modifier(Modifier::BOLD)),
        Span::raw(format!(" ({}) │ ", data.connection.label())),
        Span::styled(
            app.source_description().to_string(),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status bar at the bottom.
///
/// Shows time since the last sample and the available controls. Temporary
/// status messages and source errors take precedence.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = "r:refresh e:export ?:help q:quit";
    let status = if let Some(ref err) = app.load_error {
        format!(" Error: {} | {}", err, controls)
    } else {
        match (&app.data, app.last_received) {
            (Some(data), Some(received)) if data.has_data() => format!(
                " {} samples | Updated {} | {}",
                data.retained,
                format_age(received.elapsed()),
                controls,
            ),
            (Some(_), _) => format!(" Waiting for first sample... | {}", controls),
            (None, _) => " Loading... | q:quit".to_string(),
        }
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the dashboard.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from("  r         Refresh now"),
        Line::from("  e         Export to JSON"),
        Line::from("  ?         Toggle help"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Cards",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  Peak and average cover every"),
        Line::from("  retained sample, the chart"),
        Line::from("  shows the most recent ones."),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 40u16.min(area.width.saturating_sub(4));
    let help_height = 16u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
