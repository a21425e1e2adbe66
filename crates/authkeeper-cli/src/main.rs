//! authkeeper - a terminal front end for a cookie-session API.
//!
//! Signs in, tracks the session and sends CSRF-protected requests from an
//! interactive shell. The session flag and user record persist between runs
//! in the state directory; the server's session cookie lives only as long as
//! the process.

mod shell;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use authkeeper_core::{AuthManager, Config, FileStore};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "authkeeper", version, about = "Session-aware client for the auth API")]
struct Cli {
    /// API base URL (overrides config and AUTHKEEPER_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory for the persisted session flag and user record
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show what the local cache knows, without contacting the server
    Status,
    /// Ask the server who the session belongs to
    Whoami,
    /// Forget the persisted session state
    Reset,
    /// Interactive shell (default)
    Shell,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn build_manager(cli: &Cli) -> Result<AuthManager> {
    let mut config = Config::load()?;
    if let Some(ref url) = cli.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(ref dir) = cli.state_dir {
        config.state_dir = Some(dir.clone());
    }

    let store = FileStore::new(config.state_dir()?)?;
    info!(api = %config.api_base_url, state = %store.dir().display(), "Configured");

    AuthManager::from_config(&config, Arc::new(store)).context("Failed to create API client")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();
    let manager = build_manager(&cli)?;

    match cli.command.unwrap_or(Command::Shell) {
        Command::Status => shell::print_status(&manager),
        Command::Whoami => shell::print_whoami(&manager).await,
        Command::Reset => {
            manager.invalidate();
            println!("Session state cleared");
        }
        Command::Shell => shell::run(manager).await?,
    }

    Ok(())
}
