//! Map view: the basemap with entry markers, or a manual fallback.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Points},
        Block, Borders, Paragraph, Wrap,
    },
    Frame,
};

use hearthlog_sync::{LoadState, LocationPicker};

use crate::app::App;
use crate::map::Basemap;

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    match app.map_picker() {
        LocationPicker::Interactive(basemap) => {
            app.map_area = Some(area);
            render_canvas(frame, app, &basemap, block, area);
        }
        picker => {
            app.map_area = None;
            let lines = fallback_lines(app, &picker);
            let paragraph = Paragraph::new(lines)
                .block(block.title(" Map "))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
        }
    }
}

fn render_canvas(frame: &mut Frame, app: &App, basemap: &Basemap, block: Block, area: Rect) {
    let rows = app.rows();
    let selected = rows.get(app.selected_index);

    let markers: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|row| row.location)
        .map(|at| (at.lng, at.lat))
        .collect();
    let highlighted: Vec<(f64, f64)> = selected
        .and_then(|row| row.location)
        .map(|at| vec![(at.lng, at.lat)])
        .unwrap_or_default();

    let title = match selected {
        Some(row) => format!(" {} │ {} │ click to pin ", basemap.name, row.title),
        None => format!(" {} ", basemap.name),
    };

    let coast = app.theme.border;
    let marker = app.theme.marker;
    let highlight = app.theme.highlight;

    let canvas = Canvas::default()
        .block(block.title(title))
        .marker(Marker::Braille)
        .x_bounds([-180.0, 180.0])
        .y_bounds([-90.0, 90.0])
        .paint(|ctx| {
            for ((x1, y1), (x2, y2)) in basemap.segments() {
                ctx.draw(&CanvasLine {
                    x1,
                    y1,
                    x2,
                    y2,
                    color: coast,
                });
            }
            ctx.layer();
            ctx.draw(&Points {
                coords: &markers,
                color: marker,
            });
            ctx.draw(&Points {
                coords: &highlighted,
                color: highlight,
            });
        });

    frame.render_widget(canvas, area);
}

fn fallback_lines(app: &App, picker: &LocationPicker<Basemap>) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let mut lines = vec![Line::from("")];
    match picker {
        LocationPicker::Pending if app.map_state() == LoadState::Loading => {
            lines.push(Line::from(Span::styled("Loading map…", bold)));
        }
        LocationPicker::Pending | LocationPicker::Interactive(_) => {
            lines.push(Line::from(Span::styled("Map not loaded", bold)));
            lines.push(Line::from(Span::styled("Press m to load it", dim)));
        }
        LocationPicker::Retry { attempts, error } => {
            lines.push(Line::from(Span::styled(
                "The map didn't load",
                Style::default().fg(app.theme.warning).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(error.to_string()));
            lines.push(Line::from(Span::styled(
                format!(
                    "Attempt {} of {}. Press m to retry",
                    attempts,
                    app.services().map.ceiling() + 1
                ),
                dim,
            )));
        }
        LocationPicker::Manual { reason } => {
            lines.push(Line::from(Span::styled(
                "Map unavailable",
                Style::default().fg(app.theme.critical).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(reason.to_string()));
            lines.push(Line::from(""));
            lines.push(Line::from("Press p to enter coordinates as \"lat, lng\""));
            lines.push(Line::from(Span::styled("M resets the map loader", dim)));
        }
    }

    if let Some(row) = app.selected_row() {
        lines.push(Line::from(""));
        let at = row
            .location
            .map(|c| c.to_string())
            .unwrap_or_else(|| "no location".to_string());
        lines.push(Line::from(format!("{}: {}", row.title, at)));
    }
    lines
}
