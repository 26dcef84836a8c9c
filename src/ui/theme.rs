//! Colors and border glyphs for the interactive view.
//!
//! A [`Theme`] is a plain value handed to the renderer; nothing about styling
//! lives in globals.

use colored::{Color, Colorize};
use std::io::IsTerminal;

use crate::config::UiConfig;

/// Box-drawing characters for a panel border
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Border {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
}

pub const ROUNDED: Border = Border {
    top_left: '╭',
    top_right: '╮',
    bottom_left: '╰',
    bottom_right: '╯',
    horizontal: '─',
    vertical: '│',
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    /// When false every painter returns its input untouched
    pub enabled: bool,
    pub highlight: Color,
    pub subtle: Color,
    pub spinner: Color,
    pub error: Color,
    pub border: Border,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            enabled: true,
            highlight: Color::TrueColor {
                r: 0x7D,
                g: 0x56,
                b: 0xF4,
            },
            subtle: Color::TrueColor {
                r: 0x6C,
                g: 0x6C,
                b: 0x6C,
            },
            spinner: Color::TrueColor {
                r: 0xFF,
                g: 0x5F,
                b: 0xAF,
            },
            error: Color::Red,
            border: ROUNDED,
        }
    }
}

impl Theme {
    /// Theme without any escape sequences
    pub fn plain() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Colors only when configured and stdout is a terminal
    pub fn from_config(config: &UiConfig) -> Self {
        if config.color && std::io::stdout().is_terminal() {
            Self::default()
        } else {
            Self::plain()
        }
    }

    pub fn header(&self, text: &str) -> String {
        if self.enabled {
            text.color(self.highlight).bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn hint(&self, text: &str) -> String {
        self.paint(text, self.subtle)
    }

    pub fn spinner(&self, text: &str) -> String {
        self.paint(text, self.spinner)
    }

    pub fn outline(&self, text: &str) -> String {
        self.paint(text, self.highlight)
    }

    pub fn error_label(&self, text: &str) -> String {
        if self.enabled {
            text.color(self.error).bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.enabled {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_theme_adds_no_escapes() {
        let theme = Theme::plain();
        assert_eq!(theme.header("title"), "title");
        assert_eq!(theme.hint("hint"), "hint");
        assert_eq!(theme.outline("│"), "│");
        assert_eq!(theme.error_label("Error:"), "Error:");
    }

    #[test]
    fn test_disabled_color_config_is_plain() {
        let config = UiConfig {
            color: false,
            ..Default::default()
        };
        assert!(!Theme::from_config(&config).enabled);
    }
}
