//! GitHub Copilot backend.
//!
//! Shells out to `gh copilot explain <prompt>` and returns its combined
//! output.

use async_trait::async_trait;
use std::process::{Command as StdCommand, Stdio};
use tokio::process::Command;
use tracing::debug;

use super::{Availability, BackendKind, ExplainError, ExplainRequest, Explainer};

const GH_PROGRAM: &str = "gh";

const GH_MISSING: &str =
    "GitHub CLI (gh) is not installed.\nPlease install it: https://cli.github.com/";

const COPILOT_MISSING: &str = "GitHub Copilot is not available in your gh CLI.\n\
     Please ensure you have access to Copilot and the CLI is authenticated: Run 'gh auth login'.";

/// Copilot explainer backed by the `gh` CLI
pub struct CopilotExplainer {
    program: String,
}

impl Default for CopilotExplainer {
    fn default() -> Self {
        Self::new()
    }
}

impl CopilotExplainer {
    pub fn new() -> Self {
        Self::with_program(GH_PROGRAM)
    }

    /// Use a different executable in place of `gh`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Explainer for CopilotExplainer {
    fn kind(&self) -> BackendKind {
        BackendKind::Copilot
    }

    fn name(&self) -> &'static str {
        "GitHub Copilot"
    }

    fn check_available(&self) -> Availability {
        if which::which(&self.program).is_err() {
            return Availability::Unavailable(GH_MISSING.to_string());
        }

        let check = StdCommand::new(&self.program)
            .args(["copilot", "--help"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match check {
            Ok(status) if status.success() => Availability::Ready,
            Ok(status) => {
                debug!(%status, "gh copilot check failed");
                Availability::Unavailable(COPILOT_MISSING.to_string())
            }
            Err(err) => {
                debug!(%err, "gh copilot check could not run");
                Availability::Unavailable(COPILOT_MISSING.to_string())
            }
        }
    }

    async fn explain(&self, request: &ExplainRequest) -> Result<String, ExplainError> {
        let output = Command::new(&self.program)
            .args(["copilot", "explain"])
            .arg(request.prompt())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExplainError::Launch {
                program: self.program.clone(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(ExplainError::CommandFailed {
                status: output.status,
                output: combined.trim().to_string(),
            });
        }

        Ok(combined)
    }
}
