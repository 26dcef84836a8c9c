//! One wrapped invocation, from spawn to the wrapper's exit code.
//!
//! [`Session::run`] supervises the command and, if it failed, runs the gate,
//! collects the snapshot and hands the request to a view. The view is passed
//! in so the whole flow runs without a terminal.

use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::context::Snapshot;
use crate::explain::{Availability, ExplainRequest, Explainer};
use crate::output::{format_error, format_unavailable, print_debug_section};
use crate::signals::{exit_code_for, Signals};
use crate::supervisor::Supervisor;

/// Exit code when the wrapped command could not be started
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit code when the diagnosis view could not take over the terminal
pub const EXIT_UI_FAILURE: i32 = 1;

pub struct Session<'a> {
    pub command: &'a [String],
    pub config: &'a Config,
    /// Print the prompt before the view starts
    pub debug: bool,
}

impl Session<'_> {
    /// Run the command and, if it failed, drive the diagnosis. Messages for
    /// the user go to `err`. Returns the exit code for the wrapper.
    pub async fn run<V, Fut, W>(
        &self,
        explainer: Arc<dyn Explainer>,
        mut signals: Signals,
        view: V,
        err: &mut W,
    ) -> i32
    where
        V: FnOnce(Arc<dyn Explainer>, ExplainRequest, Signals) -> Fut,
        Fut: Future<Output = io::Result<()>>,
        W: Write,
    {
        let supervisor = Supervisor::new(self.config.capture.tail_lines);
        let result = supervisor.run(self.command, &mut signals).await;

        if let Some(start_error) = &result.start_error {
            let program = self.command.first().map(String::as_str).unwrap_or_default();
            let _ = writeln!(
                err,
                "{}",
                format_error(
                    &format!("failed to start '{program}': {start_error}"),
                    Some("Check that the command is installed and on your PATH."),
                )
            );
            return EXIT_NOT_FOUND;
        }

        let exit_code = result.exit_code;
        if exit_code == 0 {
            return 0;
        }

        if Config::is_disabled() {
            debug!(exit_code, "diagnosis disabled by GHOST_DISABLE");
            return exit_code;
        }
        if self.config.should_skip_exit_code(exit_code) {
            debug!(exit_code, "exit code in skip list");
            return exit_code;
        }

        // Both steps below shell out and block; a signal must still end them.
        let gate = {
            let explainer = explainer.clone();
            tokio::task::spawn_blocking(move || explainer.check_available())
        };
        let availability = tokio::select! {
            joined = gate => joined.unwrap_or_else(|join_err| {
                Availability::Unavailable(format!("Backend check failed: {join_err}"))
            }),
            Some(sig) = signals.recv() => {
                info!(signal = sig, "interrupted during backend check");
                return exit_code_for(sig);
            }
        };
        if let Availability::Unavailable(reason) = availability {
            info!(backend = explainer.name(), %reason, "backend unavailable");
            let _ = writeln!(err, "{}", format_unavailable(&reason));
            return exit_code;
        }

        let collect = {
            let context = self.config.context.clone();
            tokio::task::spawn_blocking(move || Snapshot::collect(&context))
        };
        let snapshot = tokio::select! {
            joined = collect => joined.unwrap_or_else(|join_err| {
                warn!(%join_err, "snapshot collection failed");
                Snapshot::default()
            }),
            Some(sig) = signals.recv() => {
                info!(signal = sig, "interrupted while collecting context");
                return exit_code_for(sig);
            }
        };

        let request = ExplainRequest::new(snapshot, result.captured_tail, self.command, exit_code);

        if self.debug {
            let prompt = request.prompt();
            print_debug_section(
                "Prompt",
                &prompt,
                Some(format!(
                    "({} chars, backend {})",
                    prompt.len(),
                    explainer.name()
                )),
            );
        }

        match view(explainer, request, signals).await {
            Ok(()) => exit_code,
            Err(view_err) => {
                let _ = writeln!(
                    err,
                    "{}",
                    format_error(
                        &format!("Alas, there's been an error within the Ghost: {view_err}"),
                        None
                    )
                );
                EXIT_UI_FAILURE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::{BackendKind, ExplainError};
    use crate::ui::{Key, Orchestrator, Phase, Renderer, Theme, UiEvent};
    use async_trait::async_trait;
    use std::future::Ready;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedSender;

    struct FakeExplainer {
        gate: Availability,
        reply: &'static str,
    }

    #[async_trait]
    impl Explainer for FakeExplainer {
        fn kind(&self) -> BackendKind {
            BackendKind::Copilot
        }

        fn name(&self) -> &'static str {
            "fake"
        }

        fn check_available(&self) -> Availability {
            self.gate.clone()
        }

        async fn explain(&self, _request: &ExplainRequest) -> Result<String, ExplainError> {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(self.reply.to_string())
        }
    }

    fn explainer(gate: Availability) -> Arc<dyn Explainer> {
        Arc::new(FakeExplainer {
            gate,
            reply: "Create the missing config file.",
        })
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    /// View that must not be reached
    fn untouched_view(
        called: Arc<AtomicBool>,
    ) -> impl FnOnce(Arc<dyn Explainer>, ExplainRequest, Signals) -> Ready<io::Result<()>> {
        move |_, _, _| {
            called.store(true, Ordering::SeqCst);
            std::future::ready(Ok(()))
        }
    }

    fn failing_view(
    ) -> impl FnOnce(Arc<dyn Explainer>, ExplainRequest, Signals) -> Ready<io::Result<()>> {
        |_, _, _| std::future::ready(Err(io::Error::other("not a terminal")))
    }

    type Sender = Arc<OnceLock<UnboundedSender<UiEvent>>>;

    /// Counts frames and presses 'q' once the dismiss hint shows up.
    struct DismissingRenderer {
        frames: Arc<Mutex<usize>>,
        tx: Sender,
    }

    impl Renderer for DismissingRenderer {
        fn draw(&mut self, lines: &[String]) -> io::Result<()> {
            *self.frames.lock().unwrap() += 1;
            if lines.iter().any(|l| l.contains("Press 'q'")) {
                if let Some(tx) = self.tx.get() {
                    let _ = tx.send(UiEvent::Key(Key::Char('q')));
                }
            }
            Ok(())
        }

        fn width(&self) -> usize {
            60
        }
    }

    fn session<'a>(command: &'a [String], config: &'a Config) -> Session<'a> {
        Session {
            command,
            config,
            debug: false,
        }
    }

    #[tokio::test]
    async fn test_success_exits_zero_without_diagnosis() {
        let config = Config::default();
        let command = sh("exit 0");
        let called = Arc::new(AtomicBool::new(false));
        let mut err = Vec::new();

        let code = session(&command, &config)
            .run(
                explainer(Availability::Ready),
                Signals::install(),
                untouched_view(called.clone()),
                &mut err,
            )
            .await;

        assert_eq!(code, 0);
        assert!(!called.load(Ordering::SeqCst));
        assert!(err.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_backend_keeps_child_code_and_skips_view() {
        colored::control::set_override(false);
        let config = Config::default();
        let command = vec!["false".to_string()];
        let called = Arc::new(AtomicBool::new(false));
        let mut err = Vec::new();

        let code = session(&command, &config)
            .run(
                explainer(Availability::Unavailable("Run 'gh auth login'.".to_string())),
                Signals::install(),
                untouched_view(called.clone()),
                &mut err,
            )
            .await;

        assert_eq!(code, 1);
        assert!(!called.load(Ordering::SeqCst), "no frame may be drawn");
        let err = String::from_utf8(err).unwrap();
        assert!(err.contains("Ghost cannot help you yet!"));
        assert!(err.contains("Run 'gh auth login'."));
    }

    #[tokio::test]
    async fn test_missing_binary_exits_127() {
        colored::control::set_override(false);
        let config = Config::default();
        let command = vec!["definitely-not-a-real-binary-ghost".to_string()];
        let called = Arc::new(AtomicBool::new(false));
        let mut err = Vec::new();

        let code = session(&command, &config)
            .run(
                explainer(Availability::Ready),
                Signals::install(),
                untouched_view(called.clone()),
                &mut err,
            )
            .await;

        assert_eq!(code, EXIT_NOT_FOUND);
        assert!(!called.load(Ordering::SeqCst));
        let err = String::from_utf8(err).unwrap();
        assert!(err.contains("failed to start 'definitely-not-a-real-binary-ghost'"));
    }

    #[tokio::test]
    async fn test_skipped_exit_code_passes_through() {
        let mut config = Config::default();
        config.capture.skip_exit_codes = vec![3];
        let command = sh("exit 3");
        let called = Arc::new(AtomicBool::new(false));

        let code = session(&command, &config)
            .run(
                explainer(Availability::Ready),
                Signals::install(),
                untouched_view(called.clone()),
                &mut io::sink(),
            )
            .await;

        assert_eq!(code, 3);
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failure_is_explained_then_dismissed() {
        let config = Config::default();
        let command = sh("i=1; while [ $i -le 30 ]; do echo \"line $i\" >&2; i=$((i+1)); done; exit 2");
        let tail = Arc::new(Mutex::new(String::new()));
        let frames = Arc::new(Mutex::new(0));
        let phase = Arc::new(Mutex::new(None));

        let view = {
            let tail = tail.clone();
            let frames = frames.clone();
            let phase = phase.clone();
            move |explainer: Arc<dyn Explainer>, request: ExplainRequest, _signals: Signals| async move {
                *tail.lock().unwrap() = request.captured_tail.clone();
                let tx = Sender::default();
                let renderer = DismissingRenderer {
                    frames,
                    tx: tx.clone(),
                };
                let orchestrator =
                    Orchestrator::new(renderer, Theme::plain(), Duration::from_millis(10));
                let _ = tx.set(orchestrator.sender());
                let model = orchestrator.run(explainer, request).await?;
                *phase.lock().unwrap() = Some(model.phase().clone());
                Ok::<(), io::Error>(())
            }
        };

        let code = session(&command, &config)
            .run(explainer(Availability::Ready), Signals::install(), view, &mut io::sink())
            .await;

        assert_eq!(code, 2);
        assert_eq!(
            *phase.lock().unwrap(),
            Some(Phase::Explained("Create the missing config file.".to_string()))
        );
        assert!(*frames.lock().unwrap() >= 2);

        let tail = tail.lock().unwrap();
        let lines: Vec<&str> = tail.lines().collect();
        assert_eq!(lines.len(), 15);
        assert_eq!(lines[0], "line 16");
        assert_eq!(lines[14], "line 30");
    }

    #[tokio::test]
    async fn test_view_failure_exits_one() {
        colored::control::set_override(false);
        let config = Config::default();
        let command = sh("exit 4");
        let mut err = Vec::new();

        let code = session(&command, &config)
            .run(
                explainer(Availability::Ready),
                Signals::install(),
                failing_view(),
                &mut err,
            )
            .await;

        assert_eq!(code, EXIT_UI_FAILURE);
        let err = String::from_utf8(err).unwrap();
        assert!(err.contains("error within the Ghost: not a terminal"));
    }
}
