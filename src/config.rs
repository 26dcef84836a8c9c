//! Configuration system for `ghost`.

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use tracing::warn;

use crate::explain::BackendKind;
use crate::tail::DEFAULT_TAIL_LINES;

/// How the failing command is captured
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CaptureConfig {
    /// Number of stderr lines kept for diagnosis
    pub tail_lines: usize,
    /// Non-zero exit codes that never trigger diagnosis
    pub skip_exit_codes: Vec<i32>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            tail_lines: DEFAULT_TAIL_LINES,
            skip_exit_codes: Vec::new(),
        }
    }
}

/// Interactive view settings
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct UiConfig {
    /// Spinner interval in milliseconds
    pub tick_ms: u64,
    /// Use colors in the view
    pub color: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            color: true,
        }
    }
}

/// Explanation backend settings
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ExplainConfig {
    pub backend: BackendKind,
    /// Model for API backends
    pub model: String,
    /// Maximum tokens to generate for API backends
    pub max_tokens: u32,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1024,
        }
    }
}

/// What the diagnostic snapshot collects
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ContextConfig {
    /// Number of commit summaries to include
    pub commit_count: usize,
    /// Environment variables that may be sent to the backend
    pub env_allowlist: Vec<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            commit_count: 3,
            env_allowlist: [
                "NODE_ENV",
                "GOOS",
                "GOARCH",
                "SHELL",
                "TERM",
                "PATH",
                "PYTHONPATH",
                "GOPATH",
                "CARGO_HOME",
                "npm_config_user_agent",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub ui: UiConfig,
    pub explain: ExplainConfig,
    pub context: ContextConfig,
}

impl Config {
    /// Load config from file, returning default config if file doesn't exist
    pub fn load() -> Self {
        Self::load_from_path(Self::config_path())
    }

    /// Load config from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read config");
                return Self::default();
            }
        };

        toml::from_str(&contents).unwrap_or_else(|err| {
            warn!(path = %path.display(), %err, "invalid config, using defaults");
            Self::default()
        })
    }

    /// Get the config file path (~/.config/ghost/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ghost").join("config.toml"))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("GHOST_BACKEND") {
            match value.parse::<BackendKind>() {
                Ok(backend) => self.explain.backend = backend,
                Err(err) => warn!(%err, "ignoring GHOST_BACKEND"),
            }
        }
        if lookup("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            self.ui.color = false;
        }
    }

    /// Check if diagnosis is disabled via environment variable
    pub fn is_disabled() -> bool {
        env::var("GHOST_DISABLE").map(|v| v == "1").unwrap_or(false)
    }

    /// Check if an exit code should be passed through without diagnosis
    pub fn should_skip_exit_code(&self, code: i32) -> bool {
        self.capture.skip_exit_codes.contains(&code)
    }
}

/// Generate default config as TOML string
pub fn generate_default_config() -> String {
    r#"# ghost configuration
# Place this file at ~/.config/ghost/config.toml

[capture]
# Number of stderr lines sent along for diagnosis
tail_lines = 15

# Non-zero exit codes that never trigger diagnosis (130 = Ctrl+C)
skip_exit_codes = []

[ui]
# Spinner interval in milliseconds
tick_ms = 100
color = true

[explain]
# "copilot" (GitHub CLI) or "anthropic" (needs ANTHROPIC_API_KEY)
backend = "copilot"
model = "claude-sonnet-4-20250514"
max_tokens = 1024

[context]
# Number of recent commits to include
commit_count = 3

# Only these environment variables are ever sent
env_allowlist = [
    "NODE_ENV", "GOOS", "GOARCH", "SHELL", "TERM", "PATH",
    "PYTHONPATH", "GOPATH", "CARGO_HOME", "npm_config_user_agent",
]

# Environment variable overrides:
# GHOST_BACKEND=anthropic - Select the backend (overrides config)
# GHOST_DISABLE=1         - Run commands without ever diagnosing
# GHOST_LOG=ghost=debug   - Write a log file to the cache directory
# NO_COLOR=1              - Disable colors
"#
    .to_string()
}

/// Print the default config to stdout
pub fn print_default_config() {
    print!("{}", generate_default_config());
}
