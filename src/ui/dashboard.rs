//! Dashboard view: metric cards above a bar chart of recent samples.

use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::CountSample;
use crate::source::DashboardSnapshot;

/// Height of the card row, borders included.
const CARD_HEIGHT: u16 = 5;

/// Gap between chart bars.
const BAR_GAP: u16 = 1;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::vertical([Constraint::Length(CARD_HEIGHT), Constraint::Min(5)]).split(area);

    let Some(ref data) = app.data else {
        let block = card_block(app, " Live count ");
        let message = app.load_error.as_deref().unwrap_or("Waiting for data...");
        frame.render_widget(
            Paragraph::new(message).alignment(Alignment::Center).block(block),
            area,
        );
        return;
    };

    render_cards(frame, app, data, chunks[0]);
    render_chart(frame, app, data, chunks[1]);
}

fn render_cards(frame: &mut Frame, app: &App, data: &DashboardSnapshot, area: Rect) {
    let cols = Layout::horizontal([Constraint::Ratio(1, 4); 4]).split(area);

    let connection_style = app.theme.connection_style(data.connection);
    let cards = [
        (" Current ", data.current_count.to_string(), app.theme.value),
        (" Peak ", data.peak.to_string(), app.theme.value),
        (" Average ", data.average.to_string(), app.theme.value),
        (
            " Connection ",
            data.connection.label().to_string(),
            connection_style.add_modifier(Modifier::BOLD),
        ),
    ];

    for ((title, value, style), col) in cards.into_iter().zip(cols.iter()) {
        let paragraph = Paragraph::new(vec![Line::from(""), Line::from(Span::styled(value, style))])
            .alignment(Alignment::Center)
            .block(card_block(app, title));
        frame.render_widget(paragraph, *col);
    }
}

fn render_chart(frame: &mut Frame, app: &App, data: &DashboardSnapshot, area: Rect) {
    let title = format!(" Last {} samples ", data.history.len());
    let block = card_block(app, &title);

    if data.history.is_empty() {
        frame.render_widget(
            Paragraph::new("No samples yet")
                .alignment(Alignment::Center)
                .block(block),
            area,
        );
        return;
    }

    let bars = chart_bars(&data.history);
    let inner_width = area.width.saturating_sub(2);
    let chart = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width(inner_width, bars.len()))
        .bar_gap(BAR_GAP)
        .bar_style(Style::default().fg(app.theme.bar))
        .value_style(app.theme.value.bg(app.theme.bar))
        .label_style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(chart, area);
}

fn card_block<'a>(app: &App, title: &'a str) -> Block<'a> {
    Block::default()
        .title(Span::styled(title, app.theme.header))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border))
}

/// One bar per sample, oldest on the left.
fn chart_bars(samples: &[CountSample]) -> Vec<Bar<'static>> {
    samples
        .iter()
        .map(|s| {
            Bar::default()
                .value(s.count)
                .label(Line::from(time_label(s.timestamp)))
                .text_value(s.count.to_string())
        })
        .collect()
}

/// Bar label in local wall-clock time.
pub fn time_label(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%H:%M:%S")
        .to_string()
}

/// Widest bar that fits `count` bars into `available` columns.
pub fn bar_width(available: u16, count: usize) -> u16 {
    let count = u16::try_from(count.max(1)).unwrap_or(u16::MAX);
    let gaps = BAR_GAP.saturating_mul(count.saturating_sub(1));
    (available.saturating_sub(gaps) / count).max(1)
}
