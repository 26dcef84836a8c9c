//! Interrupts sent to the wrapper must reach the wrapped command.
//!
//! Lives in its own test binary because it sends SIGINT to the test process.

#![cfg(unix)]

use std::path::Path;
use std::time::Duration;

use ghost::signals::Signals;
use ghost::supervisor::Supervisor;

async fn wait_for(path: &Path) {
    for _ in 0..200 {
        if path.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("{} never appeared", path.display());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sigint_is_forwarded_to_child() {
    let dir = tempfile::tempdir().unwrap();
    let ready = dir.path().join("ready");
    let marker = dir.path().join("got-int");

    let script = format!(
        "trap 'touch {marker}; echo interrupted >&2; exit 130' INT; \
         touch {ready}; \
         while true; do sleep 0.1; done",
        marker = marker.display(),
        ready = ready.display(),
    );
    let command = vec!["sh".to_string(), "-c".to_string(), script];

    let run = tokio::spawn(async move {
        let mut signals = Signals::install();
        Supervisor::new(15).run(&command, &mut signals).await
    });

    wait_for(&ready).await;
    // SAFETY: signalling our own pid; the handler installed before the
    // spawn has replaced the default SIGINT disposition.
    let rc = unsafe { libc::kill(libc::getpid(), libc::SIGINT) };
    assert_eq!(rc, 0);

    let result = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("child did not exit after SIGINT")
        .unwrap();

    assert!(marker.exists(), "child never saw SIGINT");
    assert_eq!(result.exit_code, 130);
    assert!(result.start_error.is_none());
    assert_eq!(result.captured_tail, "interrupted");
}
