// Color theme for the TUI
//
// One fixed dark palette; styles are grouped here so panels stay consistent.

use ratatui::style::{Color, Modifier, Style};

use crate::logging::LogLevel;

#[derive(Debug, Clone)]
pub struct Theme {
    pub title: Style,
    pub accent: Style,
    pub text: Style,
    pub dim: Style,
    pub error: Style,
    pub success: Style,
    pub heading: Style,
    pub code: Style,
    pub border: Style,
    pub border_focused: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            accent: Style::default().fg(Color::Cyan),
            text: Style::default().fg(Color::Gray),
            dim: Style::default().fg(Color::DarkGray),
            error: Style::default().fg(Color::Red),
            success: Style::default().fg(Color::Green),
            heading: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            code: Style::default().fg(Color::Yellow).bg(Color::Black),
            border: Style::default().fg(Color::DarkGray),
            border_focused: Style::default().fg(Color::Green),
        }
    }
}

impl Theme {
    pub fn log_level(&self, level: LogLevel) -> Style {
        match level {
            LogLevel::Error => self.error,
            LogLevel::Warn => Style::default().fg(Color::Yellow),
            LogLevel::Info => self.text,
            LogLevel::Debug | LogLevel::Trace => self.dim,
        }
    }
}
