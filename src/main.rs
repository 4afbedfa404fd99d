// labelscan - ingredient label analysis client
//
// Photograph a food label, send it to the analysis service, read the health
// report. Architecture:
// - Workflow orchestrator: owns the screen state machine, one task
// - API clients (reqwest): analyze submission plus login/signup
// - TUI (ratatui): renders state snapshots, turns keys into commands
// - CLI (clap): headless scan and credential/config management

mod api;
mod capture;
mod cli;
mod config;
mod logging;
mod report;
mod session;
mod tui;
mod workflow;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use config::{Config, LogRotation};
use logging::{LogBuffer, TuiLogLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::HttpAnalyzer;
use session::SessionStore;
use workflow::{Command, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let config = Config::from_env();

    // Subcommands run without the TUI, so the log buffer stays unused there.
    let tui_mode = args.command.is_none() && config.enable_tui;
    let log_buffer = LogBuffer::new();
    let _file_guard = init_logging(&config, &log_buffer, tui_mode);

    if let Some(command) = args.command {
        return cli::handle_command(command, &config).await;
    }

    if !config.enable_tui {
        anyhow::bail!(
            "TUI disabled (LABELSCAN_NO_TUI); use `labelscan scan <file>` for headless analysis"
        );
    }

    tracing::info!(api_url = %config.api_url, "starting labelscan");

    let analyzer = Arc::new(
        HttpAnalyzer::new(
            &config.api_url,
            Duration::from_secs(config.request_timeout_secs),
        )
        .map_err(|e| anyhow::anyhow!("{e}"))?,
    );

    let session = match SessionStore::default_token_path() {
        Some(path) => SessionStore::with_persistence(path),
        None => SessionStore::in_memory(),
    };
    let authenticated = session.is_authenticated();

    let (orchestrator, mut handles) =
        Orchestrator::new(analyzer, session, config.require_auth);
    let worker = tokio::spawn(orchestrator.run());

    let result = tui::run_tui(
        &mut handles,
        log_buffer,
        config.require_auth,
        authenticated,
    )
    .await;

    // Stop the orchestrator; it aborts any in-flight analysis on the way out.
    let _ = handles.commands.send(Command::Shutdown).await;
    let _ = worker.await;

    tracing::info!("shutdown complete");
    result
}

/// Initialize tracing with conditional output.
///
/// In TUI mode logs go to the in-memory buffer so they do not garble the
/// alternate screen; otherwise they go to stderr. File logging is layered on
/// top when enabled. Precedence for the filter: RUST_LOG > config > "info".
///
/// The returned guard must stay alive for the program's lifetime so buffered
/// file writes flush on exit.
fn init_logging(
    config: &Config,
    log_buffer: &LogBuffer,
    tui_mode: bool,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_filter = format!("labelscan={}", config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let file_writer = if config.logging.file_enabled {
        match std::fs::create_dir_all(&config.logging.file_dir) {
            Ok(()) => {
                let appender = match config.logging.file_rotation {
                    LogRotation::Hourly => tracing_appender::rolling::hourly(
                        &config.logging.file_dir,
                        &config.logging.file_prefix,
                    ),
                    LogRotation::Daily => tracing_appender::rolling::daily(
                        &config.logging.file_dir,
                        &config.logging.file_prefix,
                    ),
                    LogRotation::Never => tracing_appender::rolling::never(
                        &config.logging.file_dir,
                        &config.logging.file_prefix,
                    ),
                };
                Some(tracing_appender::non_blocking(appender))
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not create log directory {:?}: {}",
                    config.logging.file_dir, e
                );
                None
            }
        }
    } else {
        None
    };

    match file_writer {
        Some((non_blocking, guard)) => {
            // File layer uses JSON for structured log parsing.
            if tui_mode {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(TuiLogLayer::new(log_buffer.clone()))
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(non_blocking)
                            .with_ansi(false),
                    )
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(non_blocking)
                            .with_ansi(false),
                    )
                    .init();
            }
            Some(guard)
        }
        None => {
            if tui_mode {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(TuiLogLayer::new(log_buffer.clone()))
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                    .init();
            }
            None
        }
    }
}
