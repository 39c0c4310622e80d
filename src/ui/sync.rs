//! Sync view: connection health, update bus activity and loader status.

use std::time::Duration;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use hearthlog_types::{now_ms, EntityKind};

use crate::app::App;
use crate::data::duration::{format_age, format_duration};

/// Sparkline characters (8 levels of height).
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let [left, right] =
        Layout::horizontal([Constraint::Fill(3), Constraint::Fill(2)]).areas(area);

    render_status(frame, app, left);
    render_tables(frame, app, right);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let now = now_ms();
    let health = app.health();
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let label = |text: &'static str| Span::styled(format!("{:<12}", text), bold);

    let mut lines = vec![
        Line::from(vec![
            label("Health"),
            Span::styled(health.health.to_string(), app.theme.health_style(health.health)),
        ]),
        Line::from(vec![
            label("Checked"),
            Span::raw(if health.checked_at_ms == 0 {
                "never".to_string()
            } else {
                format_age(health.checked_at_ms, now)
            }),
        ]),
    ];
    if let Some(latency) = health.latency_ms {
        lines.push(Line::from(vec![
            label("Latency"),
            Span::raw(format_duration(Duration::from_millis(latency))),
        ]));
    }
    if let Some(err) = &health.last_error {
        lines.push(Line::from(vec![
            label("Last error"),
            Span::styled(err.clone(), Style::default().fg(app.theme.warning)),
        ]));
    }
    lines.push(Line::from(vec![
        label("Network"),
        Span::raw(if app.services().network.is_forced_offline() {
            "forced offline"
        } else if app.services().monitor.is_network_up() {
            "up"
        } else {
            "down"
        }),
    ]));
    lines.push(Line::from(""));

    match &app.diagnostics {
        Some(snapshot) => {
            lines.push(Line::from(vec![
                label("Listeners"),
                Span::raw(snapshot.listener_count.to_string()),
            ]));
            let rate = app
                .history
                .rate()
                .map(|r| format!(" ({:.1}/s)", r))
                .unwrap_or_default();
            lines.push(Line::from(vec![
                label("Publishes"),
                Span::raw(format!("{}{}", snapshot.publishes, rate)),
            ]));
            lines.push(Line::from(vec![
                label("Activity"),
                Span::styled(render_sparkline(&app.history.sparkline()), app.theme.header),
            ]));
            lines.push(Line::from(vec![
                label("Snapshot"),
                Span::raw(format_age(snapshot.checked_at_ms, now)),
            ]));
        }
        None => lines.push(Line::from("Collecting diagnostics…")),
    }
    lines.push(Line::from(""));

    let map = app.map_status();
    lines.push(Line::from(vec![
        label("Map"),
        Span::raw(format!(
            "{} (failures {}/{})",
            map.state, map.attempts, map.ceiling
        )),
    ]));
    if let Some(err) = map.error {
        lines.push(Line::from(vec![label(""), Span::raw(err)]));
    }

    let block = Block::default()
        .title(" Connection ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_tables(frame: &mut Frame, app: &App, area: Rect) {
    let rows: Vec<Row> = EntityKind::ALL
        .iter()
        .map(|kind| {
            let count = app.diagnostics.as_ref().and_then(|s| s.rows(*kind));
            let cell = match count {
                Some(n) => Cell::from(n.to_string()),
                None => Cell::from("unavailable")
                    .style(Style::default().add_modifier(Modifier::DIM)),
            };
            Row::new(vec![Cell::from(kind.table()), cell])
        })
        .collect();

    let total = app
        .diagnostics
        .as_ref()
        .map(|s| s.total_rows().to_string())
        .unwrap_or_else(|| "-".to_string());

    let table = Table::new(rows, [Constraint::Fill(1), Constraint::Length(12)])
        .header(Row::new(vec!["Table", "Rows"]).style(app.theme.header))
        .block(
            Block::default()
                .title(format!(" Tables ({} rows) ", total))
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        );
    frame.render_widget(table, area);
}

fn render_sparkline(data: &[u8]) -> String {
    if data.is_empty() {
        return "-".to_string();
    }

    // Take last 24 values
    let skip = data.len().saturating_sub(24);
    data[skip..]
        .iter()
        .map(|&v| SPARKLINE_CHARS[v.min(7) as usize])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparkline_keeps_the_latest_values() {
        assert_eq!(render_sparkline(&[]), "-");
        assert_eq!(render_sparkline(&[0, 3, 7, 9]), "▁▄██");

        let long: Vec<u8> = (0..30).map(|i| (i % 8) as u8).collect();
        assert_eq!(render_sparkline(&long).chars().count(), 24);
    }
}
