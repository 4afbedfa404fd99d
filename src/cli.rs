// CLI module - command-line argument parsing and handlers
//
// Subcommands cover everything the TUI does not:
// - login / logout / signup: credential management against the service
// - scan <file>: one-shot headless analysis, report to stdout
// - config --show/--reset/--path: configuration management

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::api::{AuthClient, HttpAnalyzer};
use crate::capture::RawFile;
use crate::config::{Config, VERSION};
use crate::session::SessionStore;
use crate::workflow::{Command, Effect, Orchestrator, ScreenState};

/// labelscan - ingredient label analysis client
#[derive(Parser)]
#[command(name = "labelscan")]
#[command(version = VERSION)]
#[command(about = "Scan food labels and get ingredient health reports", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the access token
    Login {
        /// Account email; prompted for when omitted
        username: Option<String>,
    },

    /// Forget the stored access token
    Logout,

    /// Create an account
    Signup {
        /// Account email; prompted for when omitted
        email: Option<String>,
    },

    /// Analyze one image without the TUI and print the report
    Scan {
        /// Path to the label photo
        file: PathBuf,
    },

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Login { username } => handle_login(config, username).await,
        Commands::Logout => handle_logout(),
        Commands::Signup { email } => handle_signup(config, email).await,
        Commands::Scan { file } => handle_scan(config, &file).await,
        Commands::Config { show, reset, path } => {
            if path {
                handle_config_path();
            } else if show {
                handle_config_show(config);
            } else if reset {
                handle_config_reset()?;
            } else {
                println!("Usage: labelscan config [--show|--reset|--path]");
                println!();
                println!("Options:");
                println!("  --show    Display effective configuration");
                println!("  --reset   Reset config file to defaults");
                println!("  --path    Show config file path");
            }
            Ok(())
        }
    }
}

async fn handle_login(config: &Config, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(u) => u,
        None => prompt("Email: ")?,
    };
    let password = prompt("Password: ")?;

    let client = auth_client(config)?;
    let token = client
        .login(&username, &password)
        .await
        .context("Login failed")?;

    let mut session = open_session()?;
    session.set_credential(token);
    println!("Logged in as {username}.");
    Ok(())
}

fn handle_logout() -> Result<()> {
    let mut session = open_session()?;
    if session.is_authenticated() {
        session.clear_credential();
        println!("Logged out.");
    } else {
        println!("No stored credential.");
    }
    Ok(())
}

async fn handle_signup(config: &Config, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(e) => e,
        None => prompt("Email: ")?,
    };
    let password = prompt("Password: ")?;

    let client = auth_client(config)?;
    client.signup(&email, &password).await.context("Signup failed")?;
    println!("Account created. Run `labelscan login` to sign in.");
    Ok(())
}

/// One-shot analysis through the same orchestrator the TUI uses, so the
/// headless path exercises identical validation and failure handling.
async fn handle_scan(config: &Config, file: &Path) -> Result<()> {
    let raw = RawFile::read(file)
        .with_context(|| format!("Cannot read {}", file.display()))?;

    let analyzer = Arc::new(
        HttpAnalyzer::new(
            &config.api_url,
            Duration::from_secs(config.request_timeout_secs),
        )
        .map_err(|e| anyhow::anyhow!("{e}"))?,
    );
    let session = open_session()?;
    let (orchestrator, mut handles) =
        Orchestrator::new(analyzer, session, config.require_auth);
    let worker = tokio::spawn(orchestrator.run());

    handles
        .commands
        .send(Command::Select(raw))
        .await
        .context("Workflow stopped unexpectedly")?;
    handles
        .commands
        .send(Command::Submit)
        .await
        .context("Workflow stopped unexpectedly")?;

    let outcome = loop {
        tokio::select! {
            changed = handles.states.changed() => {
                if changed.is_err() {
                    bail!("Workflow stopped unexpectedly");
                }
                let state = handles.states.borrow_and_update().clone();
                match state {
                    ScreenState::Reported(_, report) => break Ok(report),
                    ScreenState::Failed(_, error) => break Err(anyhow::anyhow!("{error}")),
                    _ => {}
                }
            }
            Some(effect) = handles.effects.recv() => {
                match effect {
                    Effect::RedirectToLogin => {
                        break Err(anyhow::anyhow!(
                            "Credential required. Run `labelscan login` first."
                        ));
                    }
                    Effect::InvalidImage(message) => {
                        break Err(anyhow::anyhow!("{message}"));
                    }
                }
            }
        }
    };

    let _ = handles.commands.send(Command::Shutdown).await;
    let _ = worker.await;

    let report = outcome?;
    println!("{}", report.text());
    Ok(())
}

fn handle_config_path() {
    match Config::config_path() {
        Some(path) => println!("{}", path.display()),
        None => {
            eprintln!("Error: Could not determine config path");
            std::process::exit(1);
        }
    }
}

fn handle_config_show(config: &Config) {
    println!("# Effective configuration (env > file > defaults)");
    println!();
    println!("api_url = {:?}", config.api_url);
    println!("require_auth = {}", config.require_auth);
    println!("request_timeout_secs = {}", config.request_timeout_secs);
    println!();
    println!("[logging]");
    println!("level = {:?}", config.logging.level);
    println!("file_enabled = {}", config.logging.file_enabled);
    println!("file_dir = {:?}", config.logging.file_dir.display().to_string());
    println!("file_rotation = {:?}", config.logging.file_rotation.as_str());
    println!("file_prefix = {:?}", config.logging.file_prefix);

    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
}

fn handle_config_reset() -> Result<()> {
    let Some(path) = Config::config_path() else {
        bail!("Could not determine config path");
    };

    // Confirm if file exists
    if path.exists() {
        eprint!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        );
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Error creating directory")?;
    }

    std::fs::write(&path, Config::default().to_toml()).context("Error writing config")?;
    println!("Config reset to defaults: {}", path.display());
    Ok(())
}

fn auth_client(config: &Config) -> Result<AuthClient> {
    AuthClient::new(
        &config.api_url,
        Duration::from_secs(config.request_timeout_secs),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}

fn open_session() -> Result<SessionStore> {
    let path = SessionStore::default_token_path()
        .context("Could not determine home directory for the token file")?;
    Ok(SessionStore::with_persistence(path))
}

fn prompt(label: &str) -> Result<String> {
    eprint!("{label}");
    std::io::stderr().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
