//! Diagnostic context gathered after a command fails.
//!
//! Every lookup is a short synchronous call. A lookup that fails (no git, not a
//! repository, unreadable cwd) leaves its field empty instead of failing the
//! snapshot.

use std::borrow::Cow;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

use crate::config::ContextConfig;

/// Point-in-time context handed to the explanation backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Files with uncommitted changes, one per line.
    pub file_changes: String,
    /// Recent commit summaries, newest first.
    pub recent_commits: String,
    /// Allow-listed environment variables as `KEY=value` lines.
    pub env_summary: String,
    pub os: String,
    pub arch: String,
    /// Directory the command was run from.
    pub working_dir: String,
}

impl Snapshot {
    /// Run all lookups from the current working directory.
    pub fn collect(config: &ContextConfig) -> Self {
        let dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::collect_in(config, &dir)
    }

    /// Run all lookups with `dir` as the working directory.
    pub fn collect_in(config: &ContextConfig, dir: &Path) -> Self {
        let snapshot = Self {
            file_changes: git(dir, &["diff", "--name-only"]),
            recent_commits: git(
                dir,
                &["log", "-n", &config.commit_count.to_string(), "--oneline"],
            ),
            env_summary: env_summary(&config.env_allowlist, |key| env::var(key).ok()),
            os: env::consts::OS.to_string(),
            arch: env::consts::ARCH.to_string(),
            working_dir: dir.display().to_string(),
        };
        debug!(
            changed_files = snapshot.file_changes.lines().count(),
            commits = snapshot.recent_commits.lines().count(),
            "collected snapshot"
        );
        snapshot
    }

    /// Labeled sections for every non-empty field, in prompt order.
    pub fn sections(&self) -> Vec<(&'static str, String)> {
        let mut sections = Vec::new();
        if !self.file_changes.is_empty() {
            sections.push(("Recent changes in files", self.file_changes.clone()));
        }
        if !self.recent_commits.is_empty() {
            sections.push(("Last intent (recent commits)", self.recent_commits.clone()));
        }
        if !self.env_summary.is_empty() {
            sections.push(("Environment", self.env_summary.clone()));
        }
        if !self.os.is_empty() {
            let platform = if self.arch.is_empty() {
                self.os.clone()
            } else {
                format!("{}/{}", self.os, self.arch)
            };
            sections.push(("Platform", platform));
        }
        if !self.working_dir.is_empty() {
            sections.push(("Working directory", self.working_dir.clone()));
        }
        sections
    }
}

/// Trimmed stdout of a git subcommand, or empty on any failure.
fn git(dir: &Path, args: &[&str]) -> String {
    match Command::new("git").current_dir(dir).args(args).output() {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        Ok(output) => {
            debug!(?args, status = ?output.status, "git lookup failed");
            String::new()
        }
        Err(err) => {
            warn!(?args, %err, "git unavailable");
            String::new()
        }
    }
}

/// `KEY=value` lines for allow-listed variables that are set and non-empty.
/// Never dumps the whole environment.
pub fn env_summary<F>(allowlist: &[String], lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    allowlist
        .iter()
        .filter_map(|key| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .map(|value| format!("{key}={value}"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Interpret common exit codes. Codes above 128 follow the shell's
/// `128 + signal` convention.
pub fn interpret_exit_code(code: i32) -> Cow<'static, str> {
    match code {
        0 => "success".into(),
        1 => "general error".into(),
        2 => "misuse of shell command".into(),
        126 => "permission problem or command not executable".into(),
        127 => "command not found".into(),
        128 => "invalid exit argument".into(),
        129..=254 => match describe_signal(code - 128) {
            Some(name) => format!("terminated by {name}").into(),
            None => format!("terminated by signal {}", code - 128).into(),
        },
        255 => "exit status out of range".into(),
        _ => "unknown".into(),
    }
}

#[cfg(unix)]
fn describe_signal(signal: i32) -> Option<&'static str> {
    Some(match signal {
        libc::SIGHUP => "SIGHUP (hangup)",
        libc::SIGINT => "SIGINT (Ctrl+C)",
        libc::SIGQUIT => "SIGQUIT",
        libc::SIGILL => "SIGILL (illegal instruction)",
        libc::SIGABRT => "SIGABRT (abort)",
        libc::SIGBUS => "SIGBUS (bus error)",
        libc::SIGFPE => "SIGFPE (arithmetic error)",
        libc::SIGKILL => "SIGKILL (killed)",
        libc::SIGSEGV => "SIGSEGV (segmentation fault)",
        libc::SIGPIPE => "SIGPIPE (broken pipe)",
        libc::SIGALRM => "SIGALRM",
        libc::SIGTERM => "SIGTERM",
        libc::SIGUSR1 => "SIGUSR1",
        libc::SIGUSR2 => "SIGUSR2",
        libc::SIGXCPU => "SIGXCPU (CPU time limit)",
        _ => return None,
    })
}

#[cfg(not(unix))]
fn describe_signal(_signal: i32) -> Option<&'static str> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn allowlist(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_env_summary_only_includes_allowlisted() {
        let vars: HashMap<&str, &str> = [
            ("SHELL", "/bin/zsh"),
            ("AWS_SECRET_ACCESS_KEY", "hunter2"),
            ("TERM", "xterm"),
        ]
        .into_iter()
        .collect();

        let summary = env_summary(&allowlist(&["SHELL", "TERM", "PATH"]), |key| {
            vars.get(key).map(|v| v.to_string())
        });

        assert_eq!(summary, "SHELL=/bin/zsh\nTERM=xterm");
        assert!(!summary.contains("hunter2"));
    }

    #[test]
    fn test_env_summary_skips_empty_values() {
        let summary = env_summary(&allowlist(&["NODE_ENV"]), |_| Some(String::new()));
        assert!(summary.is_empty());
    }

    #[test]
    fn test_sections_skip_empty_fields() {
        let snapshot = Snapshot {
            recent_commits: "abc123 fix build".to_string(),
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
            ..Default::default()
        };

        let sections = snapshot.sections();
        let labels: Vec<&str> = sections.iter().map(|(label, _)| *label).collect();
        assert_eq!(labels, vec!["Last intent (recent commits)", "Platform"]);
        assert_eq!(sections[1].1, "linux/x86_64");
    }

    #[test]
    fn test_default_snapshot_has_no_sections() {
        assert!(Snapshot::default().sections().is_empty());
    }

    #[test]
    fn test_collect_outside_repository_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::collect_in(&ContextConfig::default(), dir.path());

        assert_eq!(snapshot.file_changes, "");
        assert_eq!(snapshot.recent_commits, "");
        assert_eq!(snapshot.os, env::consts::OS);
        assert_eq!(snapshot.arch, env::consts::ARCH);
        assert_eq!(snapshot.working_dir, dir.path().display().to_string());
    }

    #[test]
    fn test_interpret_exit_code() {
        assert_eq!(interpret_exit_code(0), "success");
        assert_eq!(interpret_exit_code(1), "general error");
        assert_eq!(interpret_exit_code(127), "command not found");
        assert_eq!(interpret_exit_code(255), "exit status out of range");
        assert_eq!(interpret_exit_code(-1), "unknown");
    }

    #[cfg(unix)]
    #[test]
    fn test_interpret_exit_code_names_signals() {
        assert_eq!(interpret_exit_code(130), "terminated by SIGINT (Ctrl+C)");
        assert_eq!(interpret_exit_code(137), "terminated by SIGKILL (killed)");
        assert_eq!(
            interpret_exit_code(128 + libc::SIGSEGV),
            "terminated by SIGSEGV (segmentation fault)"
        );
        assert_eq!(interpret_exit_code(128 + libc::SIGTERM), "terminated by SIGTERM");
        // Not a standard signal number.
        assert_eq!(interpret_exit_code(128 + 63), "terminated by signal 63");
    }
}
