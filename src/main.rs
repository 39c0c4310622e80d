use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tracing::{error, info};

use hearthlog::app::{App, View};
use hearthlog::data::{DiagnosticsReport, MapStatus};
use hearthlog::settings::{Overrides, Settings};
use hearthlog::services::Services;
use hearthlog::ui::Theme;
use hearthlog::{events, logging, ui};

/// How often the sync diagnostics are recomputed.
const DIAGNOSTICS_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "hearthlog")]
#[command(about = "A family journal in your terminal that copes with flaky connections")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend to use: "memory" or "rest"
    #[arg(short, long)]
    gateway: Option<String>,

    /// Backend URL (for the rest gateway)
    #[arg(long)]
    endpoint: Option<String>,

    /// Sign in as this family member
    #[arg(short, long)]
    user: Option<String>,

    /// Basemap: "builtin" or a path to a JSON basemap
    #[arg(long)]
    basemap: Option<String>,

    /// Log file (filter with HEARTHLOG_LOG)
    #[arg(long)]
    log_file: Option<String>,

    /// Color theme: auto, dark or light
    #[arg(long, default_value = "auto")]
    theme: String,

    /// Export a diagnostics snapshot to this file and exit
    #[arg(short, long)]
    export: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            gateway: self.gateway.clone(),
            endpoint: self.endpoint.clone(),
            user: self.user.clone(),
            basemap: self.basemap.clone(),
            log_file: self.log_file.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref(), args.overrides())?;

    logging::init(&settings.log.file)?;
    logging::install_panic_hook();
    info!(gateway = ?settings.gateway.kind, "starting");

    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();
    let services = Services::start(&settings)?;

    // Handle export mode (non-interactive)
    if let Some(export_path) = args.export {
        return runtime.block_on(export_to_file(services, &export_path));
    }

    let app = App::new(services, Theme::named(&args.theme))?;
    let result = run_tui(app);
    if let Err(err) = &result {
        error!(%err, "exiting with error");
    }
    result
}

/// Probe once, then write the diagnostics report.
async fn export_to_file(mut services: Services, path: &Path) -> Result<()> {
    let health = services.monitor.retry_now().await;
    let snapshot = services.journal.diagnostics().await;
    let map = &services.map;
    let report = DiagnosticsReport::new(
        health,
        snapshot,
        MapStatus::new(&map.state(), map.attempts(), map.ceiling()),
    );
    report.write_to(path)?;
    services.shutdown();

    println!("Exported diagnostics to: {}", path.display());
    Ok(())
}

/// Restores the terminal when dropped, including while unwinding.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
    }
}

fn run_tui(mut app: App) -> Result<()> {
    let guard = TerminalGuard::enter()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    terminal.show_cursor()?;
    drop(guard);
    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 14;

    app.refresh_diagnostics();
    let mut last_diagnostics = Instant::now();

    while app.running {
        app.drain_outcomes();
        let notice_height = u16::from(app.visible_notice().is_some());

        terminal.draw(|frame| {
            let area = frame.area();

            // Check for minimum terminal size
            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let centered = ratatui::layout::Rect::new(
                    0,
                    (area.height / 2).saturating_sub(2),
                    area.width,
                    5.min(area.height),
                );
                frame.render_widget(paragraph, centered);
                return;
            }

            let [header, notice, tabs, content, status] = Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(notice_height),
                Constraint::Length(1),
                Constraint::Min(8),
                Constraint::Length(1),
            ])
            .areas(area);

            ui::common::render_header(frame, app, header);
            ui::common::render_notice(frame, app, notice);
            ui::common::render_tabs(frame, app, tabs);

            match app.current_view {
                View::Journal => ui::journal::render(frame, app, content),
                View::Map => ui::map::render(frame, app, content),
                View::Sync => ui::sync::render(frame, app, content),
            }

            ui::common::render_status_bar(frame, app, status);

            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        // Poll for events with a short timeout
        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => events::handle_mouse_event(app, mouse, 1 + notice_height),
                _ => {}
            }
        }

        if last_diagnostics.elapsed() >= DIAGNOSTICS_INTERVAL {
            app.refresh_diagnostics();
            last_diagnostics = Instant::now();
        }
    }

    Ok(())
}
