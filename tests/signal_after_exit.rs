//! SIGTERM that arrives after the command exited is still seen by the
//! wrapper and reaches the diagnosis view as the interrupt key.
//!
//! Lives in its own test binary because it sends SIGTERM to the test process.

#![cfg(unix)]

use std::time::Duration;

use ghost::signals::{Signals, SIGTERM};
use ghost::supervisor::Supervisor;
use ghost::ui::{self, Key, UiEvent};
use tokio::sync::mpsc::unbounded_channel;

fn terminate_self() {
    // SAFETY: signalling our own pid; the handler installed by
    // `Signals::install` has replaced the default SIGTERM disposition.
    let rc = unsafe { libc::kill(libc::getpid(), libc::SIGTERM) };
    assert_eq!(rc, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sigterm_after_child_exit_reaches_view() {
    let mut signals = Signals::install();
    let command = vec!["sh".to_string(), "-c".to_string(), "exit 1".to_string()];
    let result = Supervisor::new(15).run(&command, &mut signals).await;
    assert_eq!(result.exit_code, 1);

    terminate_self();
    let sig = tokio::time::timeout(Duration::from_secs(5), signals.recv())
        .await
        .expect("SIGTERM after the child exited was lost");
    assert_eq!(sig, Some(SIGTERM));

    let (tx, mut rx) = unbounded_channel();
    let forwarder = ui::forward_signals(signals, tx);

    terminate_self();
    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("SIGTERM during the view was not delivered");
    assert_eq!(event, Some(UiEvent::Key(Key::Interrupt)));

    forwarder.abort();
}
