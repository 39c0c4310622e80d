//! Application state and the actions keys map to.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use ratatui::layout::Rect;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::debug;

use hearthlog_sync::{LiveQuery, LoadState, LocationPicker, SyncError};
use hearthlog_types::{
    now_ms, Coordinates, EntityKind, Fields, Health, HealthNotice, HealthState, NewEntity,
    SyncSnapshot, LATITUDE_FIELD, LONGITUDE_FIELD,
};

use crate::data::entries::{AUTHOR_FIELD, CREATED_AT_FIELD, TITLE_FIELD};
use crate::data::{build_rows, DiagnosticsReport, EntryRow, MapStatus, PublishHistory};
use crate::map::Basemap;
use crate::services::Services;
use crate::ui::Theme;

/// The current view/tab in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Entries with their like, photo and comment counts.
    Journal,
    /// Entry locations on the basemap.
    Map,
    /// Connection health and update bus diagnostics.
    Sync,
}

impl View {
    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Journal => View::Map,
            View::Map => View::Sync,
            View::Sync => View::Journal,
        }
    }

    /// Cycle to the previous view.
    pub fn prev(self) -> Self {
        match self {
            View::Journal => View::Sync,
            View::Map => View::Journal,
            View::Sync => View::Map,
        }
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Journal => "Journal",
            View::Map => "Map",
            View::Sync => "Sync",
        }
    }
}

/// What typed characters go into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Title of a new entry.
    NewEntry,
    /// `lat, lng` for the selected entry.
    Pin,
}

/// Results of background actions, drained on the UI thread.
#[derive(Debug)]
pub enum Outcome {
    Status(String),
    Diagnostics(SyncSnapshot),
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,

    services: Services,
    runtime: Handle,
    entries: LiveQuery,
    photos: LiveQuery,
    comments: LiveQuery,
    likes: LiveQuery,

    pub diagnostics: Option<SyncSnapshot>,
    pub history: PublishHistory,
    pub selected_index: usize,

    pub input_mode: InputMode,
    pub input: String,

    /// The health and error whose notice the user dismissed.
    dismissed: Option<(Health, Option<String>)>,

    /// Where the map canvas was last drawn, for mouse picks.
    pub map_area: Option<Rect>,

    pub theme: Theme,
    pub status_message: Option<(String, Instant)>,

    outcome_tx: mpsc::UnboundedSender<Outcome>,
    outcome_rx: mpsc::UnboundedReceiver<Outcome>,
}

impl App {
    /// Create the app and start its live queries. Must be called inside a
    /// tokio runtime.
    pub fn new(services: Services, theme: Theme) -> Result<Self> {
        let runtime = Handle::try_current()?;
        let query = |kind| {
            LiveQuery::spawn(
                services.journal.clone(),
                kind,
                services.session.clone(),
            )
        };
        let entries = query(EntityKind::Entry);
        let photos = query(EntityKind::Photo);
        let comments = query(EntityKind::Comment);
        let likes = query(EntityKind::Like);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        Ok(Self {
            running: true,
            current_view: View::Journal,
            show_help: false,
            services,
            runtime,
            entries,
            photos,
            comments,
            likes,
            diagnostics: None,
            history: PublishHistory::new(),
            selected_index: 0,
            input_mode: InputMode::Normal,
            input: String::new(),
            dismissed: None,
            map_area: None,
            theme,
            status_message: None,
            outcome_tx,
            outcome_rx,
        })
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn user(&self) -> Option<String> {
        self.services.session.user()
    }

    /// Entries as shown, newest first.
    pub fn rows(&self) -> Vec<EntryRow> {
        let me = self.user();
        build_rows(
            &self.entries.snapshot().rows,
            &self.photos.snapshot().rows,
            &self.comments.snapshot().rows,
            &self.likes.snapshot().rows,
            me.as_deref(),
        )
    }

    /// The last refresh error of the entries view.
    pub fn entries_error(&self) -> Option<String> {
        self.entries.snapshot().error
    }

    pub fn selected_row(&self) -> Option<EntryRow> {
        self.rows().into_iter().nth(self.selected_index)
    }

    pub fn health(&self) -> HealthState {
        self.services.monitor.current_health()
    }

    /// The connection notice to show, unless the user dismissed it.
    pub fn visible_notice(&self) -> Option<HealthNotice> {
        let health = self.health();
        if self.dismissed == Some((health.health, health.last_error.clone())) {
            return None;
        }
        health.notice()
    }

    pub fn dismiss_notice(&mut self) {
        let health = self.health();
        self.dismissed = Some((health.health, health.last_error));
    }

    pub fn map_state(&self) -> LoadState {
        self.services.map.state()
    }

    pub fn map_picker(&self) -> LocationPicker<Basemap> {
        self.services.map.picker()
    }

    pub fn map_status(&self) -> MapStatus {
        let map = &self.services.map;
        MapStatus::new(&map.state(), map.attempts(), map.ceiling())
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < std::time::Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    /// Apply results of finished background actions.
    pub fn drain_outcomes(&mut self) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            match outcome {
                Outcome::Status(message) => self.set_status_message(message),
                Outcome::Diagnostics(snapshot) => {
                    self.history.record(Instant::now(), snapshot.publishes);
                    self.diagnostics = Some(snapshot);
                }
            }
        }
        let len = self.rows().len();
        if self.selected_index >= len {
            self.selected_index = len.saturating_sub(1);
        }
    }

    /// Recompute the diagnostics snapshot in the background.
    pub fn refresh_diagnostics(&self) {
        let journal = self.services.journal.clone();
        let tx = self.outcome_tx.clone();
        self.runtime.spawn(async move {
            let _ = tx.send(Outcome::Diagnostics(journal.diagnostics().await));
        });
    }

    /// Probe the backend now.
    pub fn retry_connection(&mut self) {
        self.dismissed = None;
        let monitor = self.services.monitor.clone();
        self.spawn_action(async move {
            let health = monitor.retry_now().await;
            Ok(format!("Connection: {}", health.health))
        });
    }

    pub fn toggle_offline(&mut self) {
        let forced = self.services.network.toggle_forced_offline();
        self.set_status_message(if forced {
            "Offline mode on".to_string()
        } else {
            "Offline mode off, checking network".to_string()
        });
    }

    /// Start typing a new entry's title.
    pub fn start_new_entry(&mut self) {
        self.input_mode = InputMode::NewEntry;
        self.input.clear();
    }

    /// Start typing coordinates for the selected entry.
    pub fn start_pin(&mut self) {
        let Some(row) = self.selected_row() else {
            self.set_status_message("Select an entry to pin".to_string());
            return;
        };
        self.input_mode = InputMode::Pin;
        self.input = row.location.map(|c| c.to_string()).unwrap_or_default();
    }

    pub fn input_push(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn input_pop(&mut self) {
        self.input.pop();
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input.clear();
    }

    /// Act on the typed input.
    pub fn submit_input(&mut self) {
        let input = std::mem::take(&mut self.input);
        let mode = std::mem::replace(&mut self.input_mode, InputMode::Normal);
        match mode {
            InputMode::Normal => {}
            InputMode::NewEntry => self.create_entry(input.trim()),
            InputMode::Pin => match input.parse::<Coordinates>() {
                Ok(at) => self.pin_selected(at),
                Err(err) => {
                    self.set_status_message(format!("Not saved: {}", err));
                    self.input_mode = InputMode::Pin;
                    self.input = input;
                }
            },
        }
    }

    pub fn create_entry(&mut self, title: &str) {
        if title.is_empty() {
            self.set_status_message("Entry needs a title".to_string());
            return;
        }
        let draft = NewEntity::new(EntityKind::Entry)
            .field(TITLE_FIELD, title)
            .field(AUTHOR_FIELD, self.user())
            .field(CREATED_AT_FIELD, now_ms() as i64);
        let journal = self.services.journal.clone();
        self.spawn_action(async move {
            let entry = journal.create(draft).await?;
            debug!(id = %entry.id, "entry created");
            Ok("Entry saved".to_string())
        });
    }

    pub fn like_selected(&mut self) {
        let (Some(row), Some(user)) = (self.selected_row(), self.user()) else {
            self.set_status_message("Sign in and select an entry to like it".to_string());
            return;
        };
        if row.liked_by_me {
            self.set_status_message("Already liked".to_string());
            return;
        }
        let journal = self.services.journal.clone();
        self.spawn_action(async move {
            journal.like(&row.id, &user).await?;
            Ok(format!("Liked \"{}\"", row.title))
        });
    }

    pub fn delete_selected(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let journal = self.services.journal.clone();
        self.spawn_action(async move {
            journal.delete(EntityKind::Entry, &row.id).await?;
            Ok(format!("Deleted \"{}\"", row.title))
        });
    }

    /// Save `at` as the selected entry's location.
    pub fn pin_selected(&mut self, at: Coordinates) {
        let Some(row) = self.selected_row() else {
            self.set_status_message("Select an entry to pin".to_string());
            return;
        };
        let mut patch = Fields::new();
        patch.insert(LATITUDE_FIELD.to_string(), at.lat.into());
        patch.insert(LONGITUDE_FIELD.to_string(), at.lng.into());

        let journal = self.services.journal.clone();
        self.spawn_action(async move {
            journal.update(EntityKind::Entry, &row.id, patch).await?;
            Ok(format!("Pinned \"{}\" at {}", row.title, at))
        });
    }

    /// Pin the selected entry where the map was clicked.
    pub fn pin_at_cell(&mut self, column: u16, row: u16) -> bool {
        let Some(area) = self.map_area else {
            return false;
        };
        if !matches!(self.map_picker(), LocationPicker::Interactive(_)) {
            return false;
        }
        match crate::map::coordinates_at(area, column, row) {
            Some(at) => {
                self.pin_selected(at);
                true
            }
            None => false,
        }
    }

    /// Load the map, or retry after a failure.
    pub fn load_map(&mut self) {
        let map = self.services.map.clone();
        if let LoadState::Degraded(_) = map.state() {
            self.set_status_message(
                "Map unavailable. p enters coordinates, M tries again".to_string(),
            );
            return;
        }
        self.spawn_status(async move {
            match map.start_load().await {
                LoadState::Ready => "Map ready".to_string(),
                LoadState::Degraded(err) => format!("Map unavailable ({}), enter coordinates with p", err),
                LoadState::Failed(err) => format!("Map failed: {}. Press m to retry", err),
                other => format!("Map {}", other.label()),
            }
        });
    }

    /// Forget map failures and load again.
    pub fn reset_map(&mut self) {
        self.services.map.reset();
        self.load_map();
    }

    pub fn export_diagnostics(&self, path: &Path) -> Result<()> {
        let snapshot = self
            .diagnostics
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No diagnostics yet"))?;
        DiagnosticsReport::new(self.health(), snapshot, self.map_status()).write_to(path)
    }

    /// Switch to the next view.
    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
    }

    /// Switch to the previous view.
    pub fn prev_view(&mut self) {
        self.current_view = self.current_view.prev();
    }

    /// Switch to a specific view.
    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
    }

    /// Move selection down by n items.
    pub fn select_next_n(&mut self, n: usize) {
        let max = self.rows().len().saturating_sub(1);
        self.selected_index = (self.selected_index + n).min(max);
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        self.selected_index = self.selected_index.saturating_sub(n);
    }

    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        self.selected_index = self.rows().len().saturating_sub(1);
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    fn spawn_action<F>(&self, action: F)
    where
        F: std::future::Future<Output = Result<String, SyncError>> + Send + 'static,
    {
        self.spawn_status(async move {
            match action.await {
                Ok(message) => message,
                Err(SyncError::NetworkUnavailable) => {
                    "You're offline. Nothing was saved".to_string()
                }
                Err(err) => format!("Failed: {}", err),
            }
        });
    }

    fn spawn_status<F>(&self, action: F)
    where
        F: std::future::Future<Output = String> + Send + 'static,
    {
        let tx = self.outcome_tx.clone();
        self.runtime.spawn(async move {
            let _ = tx.send(Outcome::Status(action.await));
        });
    }
}
