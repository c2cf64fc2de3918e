//! Bookshelf CLI - sign in to a bookshelf catalog from the terminal.
//!
//! Hosts the session core the way a browser front end would: it restores
//! the stored session at startup, runs one command, and reports redirects
//! caused by a rejected credential.

mod commands;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bookshelf_core::auth::SessionManager;
use bookshelf_core::config::Config;
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "bookshelf", version, about = "Bookshelf catalog client")]
struct Cli {
    /// Backend API URL (overrides config and BOOKSHELF_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account (does not sign in)
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
    },
    /// Sign in, prompting for a 2FA code when the account needs one
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign out and forget stored credentials
    Logout,
    /// Refresh and show the signed-in profile
    Whoami,
    /// Show the local session state without contacting the backend
    Status,
    /// Check whether a route may be opened with the current session
    Open { path: String },
    /// Manage two-factor authentication
    #[command(subcommand, name = "2fa")]
    TwoFactor(TwoFactorCommand),
    /// Administrative actions
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug)]
pub enum TwoFactorCommand {
    /// Generate a secret and confirm it with a code
    Setup,
    /// Confirm a previously generated secret
    Enable { code: Option<String> },
    /// Turn 2FA off
    Disable { code: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Give another account admin rights
    Grant { user_id: i64 },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .context("Log file path has no file name")?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            Ok(None)
        }
    }
}

/// Called by the gateway when the backend rejects the stored token.
fn announce_redirect(location: &str) {
    warn!(location, "Credential rejected, redirecting");
    eprintln!("Your session has ended. Run `bookshelf login` to sign in again.");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref())?;
    info!("Bookshelf CLI starting");

    let mut config = Config::load().context("Failed to load config")?;
    let mut settings = config.api_settings();
    if let Some(url) = cli.api_url {
        settings.base_url = url;
    }
    debug!(base_url = %settings.base_url, backend = ?config.credential_backend, "Config loaded");

    let store = config
        .credential_store()
        .context("Failed to open credential store")?;
    let manager = SessionManager::new(&settings, store, Arc::new(announce_redirect))
        .context("Failed to create API client")?;

    let state = manager.restore().await;
    debug!(?state, "Session restored");

    commands::run(cli.command, &manager, &mut config).await
}
