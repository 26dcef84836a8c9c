//! Explanation backends.
//!
//! An [`Explainer`] turns a failed command, its captured stderr tail and a
//! [`Snapshot`] into explanatory text with a single outbound call. Each
//! backend also answers the dependency gate through
//! [`Explainer::check_available`] before any request is made.

pub mod anthropic;
pub mod copilot;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::ExplainConfig;
use crate::context::{interpret_exit_code, Snapshot};

pub use anthropic::AnthropicExplainer;
pub use copilot::CopilotExplainer;

/// Available explanation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// GitHub Copilot through the `gh` CLI
    #[default]
    Copilot,
    /// Anthropic Claude API
    Anthropic,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Copilot => write!(f, "copilot"),
            BackendKind::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "copilot" => Ok(BackendKind::Copilot),
            "anthropic" => Ok(BackendKind::Anthropic),
            _ => Err(format!(
                "Unknown backend: {}. Valid options: copilot, anthropic",
                s
            )),
        }
    }
}

/// Result of the dependency gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Ready,
    /// Not usable; carries what the user should do about it
    Unavailable(String),
}

impl Availability {
    pub fn is_ready(&self) -> bool {
        matches!(self, Availability::Ready)
    }
}

/// Everything a backend gets to see about one failure.
#[derive(Debug, Clone)]
pub struct ExplainRequest {
    pub snapshot: Snapshot,
    pub captured_tail: String,
    /// The original command line, joined with spaces
    pub command: String,
    pub exit_code: i32,
}

const CLOSING_INSTRUCTION: &str =
    "Explain what happened and suggest the specific command to fix it if applicable.";

impl ExplainRequest {
    pub fn new(snapshot: Snapshot, captured_tail: String, command: &[String], exit_code: i32) -> Self {
        Self {
            snapshot,
            captured_tail,
            command: command.join(" "),
            exit_code,
        }
    }

    /// Single textual prompt: the command, its error tail, each non-empty
    /// context field under a heading, then the closing instruction.
    pub fn prompt(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!("I am running: {}\n", self.command));
        prompt.push_str(&format!(
            "Exit code: {} ({})\n",
            self.exit_code,
            interpret_exit_code(self.exit_code)
        ));
        let tail = self.captured_tail.trim_end();
        if tail.is_empty() {
            prompt.push_str("It failed without writing anything to stderr.\n");
        } else {
            prompt.push_str(&format!("It failed with error:\n{}\n", tail));
        }

        for (label, body) in self.snapshot.sections() {
            prompt.push_str(&format!("{}:\n{}\n", label, body));
        }

        prompt.push_str(CLOSING_INSTRUCTION);
        prompt
    }
}

/// Error types for explanation requests
#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("gh copilot failed: {output} ({status})")]
    CommandFailed {
        status: std::process::ExitStatus,
        output: String,
    },

    #[error("API key not configured for {provider}. Set {env_var} environment variable.")]
    MissingApiKey { provider: String, env_var: String },

    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    #[error("Rate limited by {provider}. Please wait and try again.")]
    RateLimited { provider: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },
}

/// A backend that can explain a failed command
#[async_trait]
pub trait Explainer: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Name for display
    fn name(&self) -> &'static str;

    /// Dependency gate: is the backend installed and authenticated?
    fn check_available(&self) -> Availability;

    /// Perform the one outbound call for `request`.
    async fn explain(&self, request: &ExplainRequest) -> Result<String, ExplainError>;
}

/// Build the configured backend
pub fn from_config(config: &ExplainConfig) -> Arc<dyn Explainer> {
    match config.backend {
        BackendKind::Copilot => Arc::new(CopilotExplainer::new()),
        BackendKind::Anthropic => Arc::new(AnthropicExplainer::from_env(
            config.model.clone(),
            config.max_tokens,
        )),
    }
}
