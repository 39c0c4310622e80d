use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::app::{App, InputMode, View};

/// File written by the `e` key.
pub const EXPORT_FILE: &str = "hearthlog_diagnostics.json";

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

    if app.input_mode != InputMode::Normal {
        handle_text_input(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        // View switching
        KeyCode::Tab => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.prev_view();
            } else {
                app.next_view();
            }
        }
        KeyCode::BackTab => app.prev_view(),
        KeyCode::Char('1') => app.set_view(View::Journal),
        KeyCode::Char('2') => app.set_view(View::Map),
        KeyCode::Char('3') => app.set_view(View::Sync),
        KeyCode::Left | KeyCode::Char('h') => app.prev_view(),
        KeyCode::Right | KeyCode::Char('l') => app.next_view(),

        // Entry selection
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::PageUp => app.select_prev_n(10),
        KeyCode::PageDown => app.select_next_n(10),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),

        // Journal
        KeyCode::Char('n') => app.start_new_entry(),
        KeyCode::Char('L') => app.like_selected(),
        KeyCode::Char('d') => app.delete_selected(),

        // Connection
        KeyCode::Char('r') => app.retry_connection(),
        KeyCode::Char('o') => app.toggle_offline(),
        KeyCode::Char('x') => app.dismiss_notice(),

        // Map
        KeyCode::Char('m') => app.load_map(),
        KeyCode::Char('M') => app.reset_map(),
        KeyCode::Char('p') => app.start_pin(),

        KeyCode::Char('?') => app.toggle_help(),

        KeyCode::Char('e') => {
            let export_path = PathBuf::from(EXPORT_FILE);
            match app.export_diagnostics(&export_path) {
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

/// Handle key input while a prompt is open
fn handle_text_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_input(),
        KeyCode::Esc => app.cancel_input(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.cancel_input(),
        KeyCode::Backspace => app.input_pop(),
        KeyCode::Char(c) => app.input_push(c),
        _ => {}
    }
}

/// Handle mouse events
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent, tabs_row: u16) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.select_prev(),
        MouseEventKind::ScrollDown => app.select_next(),

        MouseEventKind::Down(MouseButton::Left) => {
            if mouse.row == tabs_row {
                // Approximate tab positions: Journal (0-12), Map (13-21), Sync (22-31)
                let col = mouse.column;
                if col < 13 {
                    app.set_view(View::Journal);
                } else if col < 22 {
                    app.set_view(View::Map);
                } else if col < 32 {
                    app.set_view(View::Sync);
                }
                return;
            }

            if app.current_view == View::Map {
                app.pin_at_cell(mouse.column, mouse.row);
            }
        }

        _ => {}
    }
}
