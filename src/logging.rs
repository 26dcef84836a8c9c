//! File-based tracing.
//!
//! The terminal belongs to the wrapped command and then to the interactive
//! view, so log records go to `<cache_dir>/ghost/ghost.log` instead.

use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Environment variable holding a filter directive, e.g. `ghost=trace`
pub const LOG_ENV: &str = "GHOST_LOG";

const DEBUG_FILTER: &str = "ghost=debug";

pub fn log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("ghost").join("ghost.log"))
}

/// Filter to install, or `None` when logging stays off.
fn select_filter(debug: bool, env_value: Option<String>) -> Option<String> {
    match env_value.filter(|v| !v.trim().is_empty()) {
        Some(directive) => Some(directive),
        None if debug => Some(DEBUG_FILTER.to_string()),
        None => None,
    }
}

/// Install the subscriber when `--debug` or `GHOST_LOG` asks for it.
///
/// The returned guard flushes the writer on drop and must outlive every log
/// call. Failing to open the log file is reported on stderr and leaves
/// logging disabled.
pub fn init(debug: bool) -> Option<WorkerGuard> {
    let directive = select_filter(debug, std::env::var(LOG_ENV).ok())?;
    let path = log_path()?;

    if let Some(dir) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Warning: Could not create log directory {dir:?}: {e}");
            return None;
        }
    }

    let mut log_file_opts = OpenOptions::new();
    log_file_opts.create(true).append(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        log_file_opts.mode(0o600);
    }

    let log_file = match log_file_opts.open(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {path:?}: {e}");
            return None;
        }
    };

    let (writer, guard) = tracing_appender::non_blocking(log_file);
    let env_filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEBUG_FILTER));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false)
        .with_filter(env_filter);

    if tracing_subscriber::registry().with(file_layer).try_init().is_err() {
        return None;
    }
    Some(guard)
}
