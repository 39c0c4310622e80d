//! Journal view: entries with their like, photo and comment counts.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use hearthlog_types::now_ms;

use crate::app::App;
use crate::data::duration::format_age;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let rows = app.rows();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    if app.user().is_none() {
        let paragraph = Paragraph::new(" Sign in (--user) to see the journal.")
            .block(block.title(" Entries "));
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec!["Title", "By", "When", "♥", "Photos", "Comments", "Where"])
        .height(1)
        .style(app.theme.header);

    let now = now_ms();
    let table_rows: Vec<Row> = rows
        .iter()
        .map(|row| {
            let likes = Cell::from(row.likes.to_string());
            let likes = if row.liked_by_me {
                likes.style(Style::default().fg(app.theme.marker).add_modifier(Modifier::BOLD))
            } else {
                likes
            };
            Row::new(vec![
                Cell::from(row.title.clone()),
                Cell::from(row.author.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(
                    row.created_at_ms
                        .map(|at| format_age(at, now))
                        .unwrap_or_else(|| "-".to_string()),
                ),
                likes,
                Cell::from(row.photos.to_string()),
                Cell::from(row.comments.to_string()),
                Cell::from(
                    row.location
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(3),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Length(3),
        Constraint::Length(7),
        Constraint::Length(9),
        Constraint::Fill(2),
    ];

    let error = app
        .entries_error()
        .map(|e| format!(" [stale: {}]", e))
        .unwrap_or_default();
    let title = format!(" Entries ({}){} ", rows.len(), error);

    let table = Table::new(table_rows, widths)
        .header(header)
        .block(block.title(title))
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    if !rows.is_empty() {
        state.select(Some(app.selected_index.min(rows.len() - 1)));
    }

    frame.render_stateful_widget(table, area, &mut state);
}
