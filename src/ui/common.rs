//! Common UI components shared across views.
//!
//! This module contains the header bar, notice banner, tab bar, status bar,
//! and help overlay.

use std::time::Duration;

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};

use hearthlog_types::NoticeKind;

use crate::app::{App, InputMode, View};
use crate::data::duration::format_duration;

/// Render the header bar with connection health.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let health = app.health();
    let user = app.user().unwrap_or_else(|| "signed out".to_string());
    let latency = health
        .latency_ms
        .map(|ms| format!(" {}", format_duration(Duration::from_millis(ms))))
        .unwrap_or_default();

    let mut spans = vec![
        Span::styled(
            format!(" {} ", health.health.symbol()),
            app.theme.health_style(health.health),
        ),
        Span::styled("HEARTHLOG ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(
            format!("{}{}", health.health, latency),
            app.theme.health_style(health.health),
        ),
        Span::raw(" │ "),
        Span::raw(user),
    ];
    if app.services().network.is_forced_offline() {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(
            "forced offline",
            Style::default().fg(app.theme.warning),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the connection notice, if one is showing.
pub fn render_notice(frame: &mut Frame, app: &App, area: Rect) {
    let Some(notice) = app.visible_notice() else {
        return;
    };
    let color = match notice.kind {
        NoticeKind::NoNetwork => app.theme.critical,
        NoticeKind::BackendError => app.theme.warning,
    };
    let actions = if notice.retryable {
        "  r:retry x:dismiss"
    } else {
        "  x:dismiss"
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", notice.headline),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(notice.detail),
        Span::styled(actions, Style::default().add_modifier(Modifier::DIM)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Render the tab bar showing available views.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = vec![
        Line::from(" 1:Journal "),
        Line::from(" 2:Map "),
        Line::from(" 3:Sync "),
    ];

    let selected = match app.current_view {
        View::Journal => 0,
        View::Map => 1,
        View::Sync => 2,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Shows an open prompt first, then any temporary status message, then
/// the controls for the current view.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let prompt = match app.input_mode {
        InputMode::Normal => None,
        InputMode::NewEntry => Some("New entry title"),
        InputMode::Pin => Some("Coordinates (lat, lng)"),
    };
    if let Some(prompt) = prompt {
        let line = Line::from(vec![
            Span::styled(format!(" {}: ", prompt), app.theme.header),
            Span::raw(format!("{}_", app.input)),
            Span::styled("  Enter:save Esc:cancel", Style::default().add_modifier(Modifier::DIM)),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = match app.current_view {
        View::Journal => "n:new L:like d:delete p:pin Tab:switch ?:help q:quit",
        View::Map => "m:load M:reset p:pin click:pin ↑↓:select ?:help q:quit",
        View::Sync => "r:retry o:offline e:export ?:help q:quit",
    };
    let status = format!(" {} | {}", app.current_view.label(), controls);
    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )])
    };
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Navigation"),
        Line::from("  ←/→ h/l 1-3 Switch views"),
        Line::from("  ↑/↓ j/k     Select entry"),
        Line::from("  PgUp/PgDn   Jump 10 entries"),
        Line::from(""),
        section(" Journal"),
        Line::from("  n         New entry"),
        Line::from("  L         Like selected entry"),
        Line::from("  d         Delete selected entry"),
        Line::from(""),
        section(" Map"),
        Line::from("  m         Load or retry the map"),
        Line::from("  M         Reset the map loader"),
        Line::from("  p         Pin by coordinates"),
        Line::from(""),
        section(" Connection"),
        Line::from("  r         Retry connection"),
        Line::from("  o         Toggle offline mode"),
        Line::from("  x         Dismiss notice"),
        Line::from("  e         Export diagnostics"),
        Line::from("  q         Quit"),
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

    // Center the help overlay - responsive to terminal size
    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 28u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
