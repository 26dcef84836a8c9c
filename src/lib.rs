//! Ghost - run a command and explain why it failed
//!
//! This library provides the pieces of the `ghost` wrapper: process
//! supervision with a bounded stderr tail, the diagnostic context snapshot,
//! explanation backends and the interactive diagnosis view.

pub mod app;
pub mod cli;
pub mod config;
pub mod context;
pub mod explain;
pub mod logging;
pub mod output;
pub mod signals;
pub mod supervisor;
pub mod tail;
pub mod ui;

// Re-export commonly used types
pub use app::Session;
pub use cli::Cli;
pub use config::Config;
pub use context::Snapshot;
pub use explain::{Availability, BackendKind, ExplainError, ExplainRequest, Explainer};
pub use signals::Signals;
pub use supervisor::{ExecutionResult, Supervisor};
pub use tail::TailBuffer;
