//! Plain terminal output outside the interactive view.

use colored::Colorize;

pub const USAGE: &str = "Usage: ghost <command> [args...]";

const GATE_HEADER: &str = "👻 Ghost cannot help you yet!";

pub fn format_error(message: &str, tip: Option<&str>) -> String {
    let mut output = format!("{} {}", "Error:".red().bold(), message);
    if let Some(tip) = tip {
        output.push('\n');
        output.push_str(&format!("{} {}", "Tip:".blue().bold(), tip));
    }
    output
}

/// Header and reason shown when the explanation backend is not usable.
pub fn format_unavailable(reason: &str) -> String {
    format!("{}\n{}", GATE_HEADER.yellow().bold(), reason)
}

pub fn print_usage() {
    println!("{USAGE}");
}

pub fn print_debug_section(title: &str, body: &str, footer: Option<String>) {
    eprintln!("{}", format!("=== DEBUG: {title} ===").yellow().bold());
    if body.trim().is_empty() {
        eprintln!("{}", "| <empty>".dimmed());
    } else {
        for line in body.lines() {
            eprintln!("{}", format!("| {line}").bright_white());
        }
    }
    if let Some(footer) = footer {
        eprintln!("{}", footer.dimmed());
    }
    eprintln!();
}
