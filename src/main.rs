use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use ghost::app::Session;
use ghost::cli::Cli;
use ghost::config::{print_default_config, Config};
use ghost::explain::{self, ExplainRequest, Explainer};
use ghost::logging;
use ghost::output::{format_error, print_usage};
use ghost::signals::Signals;
use ghost::ui::{self, Theme};

fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "ghost", &mut io::stdout());
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", format_error(&format!("{err:#}"), None));
            1
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        print_completions(shell);
        return Ok(0);
    }

    if cli.print_config {
        print_default_config();
        return Ok(0);
    }

    if cli.command.is_empty() {
        print_usage();
        return Ok(0);
    }

    let _log_guard = logging::init(cli.debug);

    let mut config = Config::load();
    config.apply_env_overrides();
    if let Some(backend) = cli.backend {
        config.explain.backend = backend;
    }
    debug!(?config, "configuration loaded");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let theme = Theme::from_config(&config.ui);
    let tick = Duration::from_millis(config.ui.tick_ms.max(1));
    let session = Session {
        command: &cli.command,
        config: &config,
        debug: cli.debug,
    };

    let code = runtime.block_on(async {
        // Installed before the spawn and kept for the whole run.
        let signals = Signals::install();
        let explainer = explain::from_config(&config.explain);
        let view = move |explainer: Arc<dyn Explainer>, request: ExplainRequest, signals: Signals| {
            ui::install_panic_hook();
            ui::run(explainer, request, signals, theme, tick)
        };
        session
            .run(explainer, signals, view, &mut io::stderr())
            .await
    });

    // A request still in flight after the view was dismissed is abandoned.
    runtime.shutdown_background();
    Ok(code)
}
