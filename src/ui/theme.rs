//! Light and dark themes, picked by name or from the terminal background.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use hearthlog_types::Health;

/// Colors and styles shared by every view.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent for the selection marker on the map and active elements.
    pub highlight: Color,
    /// Backend reachable but erroring.
    pub warning: Color,
    /// No network.
    pub critical: Color,
    pub healthy: Color,
    /// Entry markers on the map.
    pub marker: Color,
    /// Borders, and coastlines on the map.
    pub border: Color,
    pub header: Style,
    pub selected: Style,
    pub tab_active: Style,
    pub tab_inactive: Style,
    pub border_type: BorderType,
}

impl Theme {
    pub fn dark() -> Self {
        Self::with_accent(Color::Cyan, Color::Gray, Color::DarkGray)
    }

    pub fn light() -> Self {
        Self::with_accent(Color::Blue, Color::DarkGray, Color::LightBlue)
    }

    fn with_accent(accent: Color, muted: Color, selection: Color) -> Self {
        let strong = Style::default().fg(accent).add_modifier(Modifier::BOLD);
        Self {
            highlight: accent,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            marker: Color::Magenta,
            border: muted,
            header: strong,
            selected: Style::default().bg(selection).add_modifier(Modifier::BOLD),
            tab_active: strong,
            tab_inactive: Style::default().fg(muted),
            border_type: BorderType::Rounded,
        }
    }

    /// `dark`, `light`, or anything else to follow the terminal.
    pub fn named(name: &str) -> Self {
        match name {
            "dark" => Self::dark(),
            "light" => Self::light(),
            _ => Self::auto_detect(),
        }
    }

    /// Light theme on a bright background, dark otherwise or when the
    /// terminal doesn't answer.
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn health_style(&self, health: Health) -> Style {
        let style = Style::default();
        match health {
            Health::Online => style.fg(self.healthy),
            Health::Degraded => style.fg(self.warning),
            Health::Offline => style.fg(self.critical).add_modifier(Modifier::BOLD),
            Health::Unknown => style.add_modifier(Modifier::DIM),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_stands_out() {
        let theme = Theme::dark();
        let offline = theme.health_style(Health::Offline);
        assert_eq!(offline.fg, Some(theme.critical));
        assert!(offline.add_modifier.contains(Modifier::BOLD));
        assert_eq!(theme.health_style(Health::Online).fg, Some(theme.healthy));
    }

    #[test]
    fn named_themes() {
        assert_eq!(Theme::named("light").highlight, Color::Blue);
        assert_eq!(Theme::named("dark").highlight, Color::Cyan);
        assert_eq!(Theme::light().tab_inactive.fg, Some(Color::DarkGray));
    }
}
