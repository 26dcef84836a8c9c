//! Supervision of the wrapped command.
//!
//! The child inherits stdin and stdout. Its stderr is piped through a
//! [`Tee`] so every chunk reaches the user's terminal as it arrives while a
//! [`TailBuffer`] keeps the last lines for diagnosis. Interrupt and terminate
//! signals received by the wrapper while the child runs are relayed to it.

use std::io::{self, Write};
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::signals::Signals;
use crate::tail::TailBuffer;

/// Exit code reported when the command could not be started at all.
pub const NOT_STARTED: i32 = -1;

/// Outcome of one supervised run.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Status code of the child, `128 + N` when killed by signal N, or
    /// [`NOT_STARTED`].
    pub exit_code: i32,
    /// Last lines the child wrote to stderr.
    pub captured_tail: String,
    /// Why the child could not be spawned.
    pub start_error: Option<io::Error>,
}

impl ExecutionResult {
    fn empty() -> Self {
        Self {
            exit_code: 0,
            captured_tail: String::new(),
            start_error: None,
        }
    }

    fn not_started(err: io::Error) -> Self {
        Self {
            exit_code: NOT_STARTED,
            captured_tail: String::new(),
            start_error: Some(err),
        }
    }

    /// True when the child ran and exited with status 0, or nothing was run.
    pub fn succeeded(&self) -> bool {
        self.start_error.is_none() && self.exit_code == 0
    }
}

/// Fans every write out to two sinks.
///
/// Both sinks see every chunk even if the first one fails, so a broken
/// terminal never starves the capture.
#[derive(Debug)]
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let first = self.first.write_all(buf);
        let second = self.second.write_all(buf);
        first.and(second).map(|()| buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let first = self.first.flush();
        let second = self.second.flush();
        first.and(second)
    }
}

/// Copy `source` into `sink` until EOF, flushing after every chunk, and hand
/// the sink back.
///
/// Write errors are logged once and copying continues: the child must never
/// block on a full pipe because a destination went away.
pub async fn pump<R, W>(mut source: R, mut sink: W) -> W
where
    R: AsyncRead + Unpin,
    W: Write,
{
    let mut buf = [0u8; 8192];
    let mut write_failed = false;
    loop {
        match source.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if let Err(err) = sink.write_all(&buf[..n]).and_then(|()| sink.flush()) {
                    if !write_failed {
                        warn!(%err, "failed to forward child stderr");
                        write_failed = true;
                    }
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!(%err, "stopped reading child stderr");
                break;
            }
        }
    }
    sink
}

/// Map a finished child's status to a single exit code.
///
/// Signal deaths become `128 + signal`, the shell convention.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Runs one command at a time with live output and a captured stderr tail.
#[derive(Debug, Clone)]
pub struct Supervisor {
    tail_lines: usize,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(crate::tail::DEFAULT_TAIL_LINES)
    }
}

impl Supervisor {
    pub fn new(tail_lines: usize) -> Self {
        Self { tail_lines }
    }

    /// Run `command` to completion. Attempted exactly once; never retried.
    ///
    /// Signals arriving while the child runs are forwarded to it. A signal
    /// arriving after it exited is deferred on `signals` for the caller.
    pub async fn run(&self, command: &[String], signals: &mut Signals) -> ExecutionResult {
        let Some((program, args)) = command.split_first() else {
            return ExecutionResult::empty();
        };

        let mut child = match Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                debug!(program = %program, %err, "failed to spawn");
                return ExecutionResult::not_started(err);
            }
        };
        let pid = child.id();
        debug!(program = %program, ?pid, "spawned child");

        let stderr = child.stderr.take();
        let sink = Tee::new(io::stderr(), TailBuffer::new(self.tail_lines));
        let mut copier = tokio::spawn(async move {
            match stderr {
                Some(stderr) => pump(stderr, sink).await,
                None => sink,
            }
        });

        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                Some(sig) = signals.recv() => forward(pid, sig),
            }
        };

        // The process may exit before its stderr is drained; wait for both.
        // The child is reaped by now, so its pid is no longer ours to signal.
        let joined = tokio::select! {
            joined = &mut copier => joined,
            Some(sig) = signals.recv() => {
                // A grandchild may still hold the pipe open; stop waiting.
                debug!(signal = sig, "signal while draining stderr");
                signals.defer(sig);
                copier.abort();
                copier.await
            }
        };
        let tail = match joined {
            Ok(sink) => sink.into_parts().1,
            Err(err) if err.is_cancelled() => TailBuffer::new(self.tail_lines),
            Err(err) => {
                warn!(%err, "stderr copy task failed");
                TailBuffer::new(self.tail_lines)
            }
        };

        let exit_code = match status {
            Ok(status) => exit_code_of(status),
            Err(err) => {
                warn!(%err, "failed to wait for child");
                1
            }
        };
        debug!(exit_code, tail_lines = tail.lines().len(), "child finished");

        ExecutionResult {
            exit_code,
            captured_tail: tail.to_string(),
            start_error: None,
        }
    }
}

#[cfg(unix)]
fn forward(pid: Option<u32>, sig: i32) {
    let Some(pid) = pid else {
        return;
    };
    // SAFETY: kill(2) takes plain integers and touches no memory of ours.
    let rc = unsafe { libc::kill(pid as libc::pid_t, sig) };
    if rc == 0 {
        info!(pid, signal = sig, "forwarded signal to child");
    } else {
        warn!(pid, signal = sig, err = %io::Error::last_os_error(), "failed to forward signal");
    }
}

/// Console interrupts already reach every process attached to the console.
#[cfg(not(unix))]
fn forward(_pid: Option<u32>, _sig: i32) {}
