//! Rendering of the current [`Phase`] into terminal lines.
//!
//! [`render`] is a pure function of the phase, the theme and the available
//! width; the caller decides where the lines go.

use regex::Regex;
use std::sync::OnceLock;
use textwrap::core::display_width;

use super::state::Phase;
use super::theme::Theme;

pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const TITLE: &str = "👻 Ghost Agent Analysis";
const LOADING_TEXT: &str = "Consulting the Ghost...";
const DISMISS_HINT: &str = "Press 'q' to dismiss";

const MIN_PANEL_WIDTH: usize = 20;
const MAX_PANEL_WIDTH: usize = 100;
/// Horizontal padding inside the panel, per side
const PAD_X: usize = 2;

pub fn render(phase: &Phase, theme: &Theme, width: usize) -> Vec<String> {
    match phase {
        Phase::Loading { frame } => {
            let glyph = SPINNER_FRAMES[frame % SPINNER_FRAMES.len()];
            vec![
                String::new(),
                format!(" {} {}", theme.spinner(glyph), LOADING_TEXT),
            ]
        }
        Phase::Explained(text) => {
            let mut lines = vec![theme.header(TITLE), String::new()];
            lines.extend(panel(text, theme, width));
            lines.push(String::new());
            lines.push(theme.hint(DISMISS_HINT));
            lines
        }
        Phase::Errored(message) => {
            let message = clean_text(message);
            let mut lines = Vec::new();
            for (i, line) in message.lines().enumerate() {
                let line = if i == 0 {
                    format!("{} {}", theme.error_label("Error:"), line)
                } else {
                    line.to_string()
                };
                lines.push(line);
            }
            if lines.is_empty() {
                lines.push(theme.error_label("Error:"));
            }
            lines.push(String::new());
            lines.push(theme.hint(DISMISS_HINT));
            lines
        }
    }
}

/// Lay `text` out inside a bordered, padded box at most `width` columns wide.
/// Below [`MIN_PANEL_WIDTH`] the text is wrapped to `width` without a box so
/// no row is wider than the terminal.
fn panel(text: &str, theme: &Theme, width: usize) -> Vec<String> {
    let border = theme.border;
    let outer = width.min(MAX_PANEL_WIDTH);
    if outer < MIN_PANEL_WIDTH {
        return wrap_body(&clean_text(text), outer.max(1));
    }
    let inner = outer - 2 - 2 * PAD_X;
    let body = wrap_body(&clean_text(text), inner);

    let rule = border.horizontal.to_string().repeat(outer - 2);
    let side = theme.outline(&border.vertical.to_string());
    let row = |content: &str| {
        let fill = inner.saturating_sub(display_width(content));
        format!(
            "{side}{pad}{content}{fill}{pad}{side}",
            pad = " ".repeat(PAD_X),
            fill = " ".repeat(fill),
        )
    };

    let mut lines = Vec::with_capacity(body.len() + 4);
    lines.push(theme.outline(&format!(
        "{}{}{}",
        border.top_left, rule, border.top_right
    )));
    lines.push(row(""));
    lines.extend(body.iter().map(|l| row(l.as_str())));
    lines.push(row(""));
    lines.push(theme.outline(&format!(
        "{}{}{}",
        border.bottom_left, rule, border.bottom_right
    )));
    lines
}

fn ansi_pattern() -> Option<&'static Regex> {
    static ANSI: OnceLock<Option<Regex>> = OnceLock::new();
    ANSI.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07]*\x07").ok())
        .as_ref()
}

fn wrap_body(text: &str, width: usize) -> Vec<String> {
    let mut body: Vec<String> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            body.push(String::new());
        } else {
            body.extend(textwrap::wrap(line, width).into_iter().map(|l| l.into_owned()));
        }
    }
    while body.first().is_some_and(|l| l.is_empty()) {
        body.remove(0);
    }
    while body.last().is_some_and(|l| l.is_empty()) {
        body.pop();
    }
    body
}

/// Strip escape sequences and carriage returns, expand tabs.
pub fn clean_text(text: &str) -> String {
    let stripped = match ansi_pattern() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    };
    stripped.replace('\r', "").replace('\t', "    ")
}
