//! Interrupt and terminate signals received by the wrapper.
//!
//! A handler stays installed for the rest of the process once tokio has
//! registered it, and the default action never comes back. One [`Signals`]
//! value is therefore created before the command is spawned and handed from
//! phase to phase: the supervisor forwards what it receives to the child, the
//! steps before the view turn it into an exit, and the view treats it as the
//! interrupt key.

/// Exit code of a process that stopped because of `signal`.
pub fn exit_code_for(signal: i32) -> i32 {
    128 + signal
}

#[cfg(unix)]
mod imp {
    use tokio::signal::unix::{signal, Signal, SignalKind};
    use tracing::warn;

    pub const SIGINT: i32 = libc::SIGINT;
    pub const SIGTERM: i32 = libc::SIGTERM;

    pub struct Signals {
        interrupt: Option<Signal>,
        terminate: Option<Signal>,
        pending: Option<i32>,
    }

    impl Signals {
        /// Register SIGINT and SIGTERM handlers. A handler that cannot be
        /// registered is logged and that signal keeps its default action.
        pub fn install() -> Self {
            Self {
                interrupt: register(SignalKind::interrupt(), "SIGINT"),
                terminate: register(SignalKind::terminate(), "SIGTERM"),
                pending: None,
            }
        }

        /// Next signal number, deferred ones first. `None` when no handler
        /// is installed.
        pub async fn recv(&mut self) -> Option<i32> {
            if let Some(sig) = self.pending.take() {
                return Some(sig);
            }
            tokio::select! {
                Some(()) = next(&mut self.interrupt) => Some(SIGINT),
                Some(()) = next(&mut self.terminate) => Some(SIGTERM),
                else => None,
            }
        }

        /// Keep `sig` for the next [`Signals::recv`]. The first deferred
        /// signal wins.
        pub fn defer(&mut self, sig: i32) {
            self.pending.get_or_insert(sig);
        }
    }

    fn register(kind: SignalKind, name: &str) -> Option<Signal> {
        match signal(kind) {
            Ok(stream) => Some(stream),
            Err(err) => {
                warn!(signal = name, %err, "cannot install signal handler");
                None
            }
        }
    }

    async fn next(stream: &mut Option<Signal>) -> Option<()> {
        match stream {
            Some(stream) => stream.recv().await,
            None => None,
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use tracing::warn;

    pub const SIGINT: i32 = 2;
    pub const SIGTERM: i32 = 15;

    /// Console Ctrl-C only.
    pub struct Signals {
        pending: Option<i32>,
    }

    impl Signals {
        pub fn install() -> Self {
            Self { pending: None }
        }

        pub async fn recv(&mut self) -> Option<i32> {
            if let Some(sig) = self.pending.take() {
                return Some(sig);
            }
            match tokio::signal::ctrl_c().await {
                Ok(()) => Some(SIGINT),
                Err(err) => {
                    warn!(%err, "cannot listen for Ctrl-C");
                    None
                }
            }
        }

        pub fn defer(&mut self, sig: i32) {
            self.pending.get_or_insert(sig);
        }
    }
}

pub use imp::{Signals, SIGINT, SIGTERM};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_for_signal() {
        assert_eq!(exit_code_for(SIGINT), 130);
        assert_eq!(exit_code_for(SIGTERM), 143);
    }

    #[tokio::test]
    async fn test_deferred_signal_is_returned_first() {
        let mut signals = Signals::install();
        signals.defer(SIGTERM);
        signals.defer(SIGINT);
        assert_eq!(signals.recv().await, Some(SIGTERM));
    }
}
