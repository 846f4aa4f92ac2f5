//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::config::ThemeChoice;
use crate::data::StepStatus;
use crate::source::Health;

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Color for warnings and in-progress states.
    pub warning: Color,
    /// Color for errors.
    pub critical: Color,
    /// Color for healthy components.
    pub healthy: Color,
    /// Color for components that are not reported healthy.
    pub unknown: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Color for the first chart series and bars.
    pub series_primary: Color,
    /// Color for the second chart series and bars.
    pub series_secondary: Color,
    /// Style for section titles and table headers.
    pub header: Style,
    /// Style for the active tab.
    pub tab_active: Style,
    /// Style for inactive tabs.
    pub tab_inactive: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            unknown: Color::Yellow,
            border: Color::Gray,
            series_primary: Color::Rgb(0x88, 0x84, 0xd8),
            series_secondary: Color::Rgb(0x82, 0xca, 0x9d),
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            unknown: Color::Rgb(0xb4, 0x83, 0x00),
            border: Color::DarkGray,
            series_primary: Color::Rgb(0x5a, 0x55, 0xb0),
            series_secondary: Color::Rgb(0x2e, 0x8b, 0x57),
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        // Use terminal-light crate to detect background luminance
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn from_choice(choice: ThemeChoice) -> Self {
        match choice {
            ThemeChoice::Auto => Self::auto_detect(),
            ThemeChoice::Dark => Self::dark(),
            ThemeChoice::Light => Self::light(),
        }
    }

    /// Style for a component's health badge.
    ///
    /// Only `healthy` gets the healthy style; everything else, including a
    /// component missing from the snapshot, is drawn as unknown.
    pub fn health_style(&self, health: Option<Health>) -> Style {
        match health {
            Some(Health::Healthy) => Style::default().fg(self.healthy).add_modifier(Modifier::BOLD),
            _ => Style::default().fg(self.unknown),
        }
    }

    /// Style of the link between two components.
    pub fn link_style(&self, from: Option<Health>, to: Option<Health>) -> Style {
        if from == Some(Health::Healthy) && to == Some(Health::Healthy) {
            Style::default().fg(self.healthy)
        } else {
            Style::default().fg(self.border).add_modifier(Modifier::DIM)
        }
    }

    /// Pipeline step colors are fixed and do not follow the theme.
    pub fn step_color(status: StepStatus) -> Color {
        match status {
            StepStatus::Completed => Color::Rgb(0x27, 0xae, 0x60),
            StepStatus::Running => Color::Rgb(0xf3, 0x9c, 0x12),
            StepStatus::Pending => Color::Rgb(0x34, 0x98, 0xdb),
            StepStatus::Failed => Color::Rgb(0xe7, 0x4c, 0x3c),
        }
    }

    pub fn step_style(status: StepStatus) -> Style {
        let style = Style::default().fg(Self::step_color(status));
        if status == StepStatus::Running {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_style() {
        let theme = Theme::dark();
        assert_eq!(theme.health_style(Some(Health::Healthy)).fg, Some(theme.healthy));
        assert_eq!(theme.health_style(Some(Health::Unhealthy)).fg, Some(theme.unknown));
        assert_eq!(theme.health_style(Some(Health::Unknown)).fg, Some(theme.unknown));
        assert_eq!(theme.health_style(None).fg, Some(theme.unknown));
    }

    #[test]
    fn test_link_needs_both_ends_healthy() {
        let theme = Theme::light();
        let up = Some(Health::Healthy);
        assert_eq!(theme.link_style(up, up).fg, Some(theme.healthy));
        assert_ne!(theme.link_style(up, None).fg, Some(theme.healthy));
        assert_ne!(theme.link_style(Some(Health::Unhealthy), up).fg, Some(theme.healthy));
    }

    #[test]
    fn test_step_colors() {
        assert_eq!(Theme::step_color(StepStatus::Completed), Color::Rgb(0x27, 0xae, 0x60));
        assert_eq!(Theme::step_color(StepStatus::Failed), Color::Rgb(0xe7, 0x4c, 0x3c));
    }
}
