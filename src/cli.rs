//! Command-line interface definitions for the `ghost` wrapper.

use clap::Parser;
use clap_complete::Shell;

use crate::explain::BackendKind;

/// Run a command; if it fails, explain why
#[derive(Parser, Debug)]
#[command(
    name = "ghost",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GHOST_GIT_SHA"), ")"),
    about,
    long_about = None
)]
#[command(
    after_help = "EXAMPLES:\n    ghost npm run build\n    ghost --backend anthropic cargo test -- --nocapture\n    GHOST_DISABLE=1 ghost make"
)]
pub struct Cli {
    /// Command to run, followed by its arguments
    #[arg(trailing_var_arg = true, value_name = "COMMAND")]
    pub command: Vec<String>,

    /// Log to the cache directory and print the prompt before explaining
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Explanation backend (overrides config file and GHOST_BACKEND)
    #[arg(long, short = 'b', value_enum, value_name = "BACKEND")]
    pub backend: Option<BackendKind>,

    /// Generate shell completions
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,

    /// Print the default configuration file and exit
    #[arg(long)]
    pub print_config: bool,
}
