//! Portal - a command-line front end for the full-stack template API.
//!
//! Each subcommand is one visit to the site: the session is restored from
//! the stored token, the command runs, and the resulting view is printed.

mod app;
mod views;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

/// Log file name prefix inside `--log-dir`
const LOG_FILE_PREFIX: &str = "portal.log";

#[derive(Parser, Debug)]
#[command(name = "portal", version, about = "Sign in to and explore the full-stack template API")]
struct Cli {
    /// API base endpoint, e.g. http://localhost:8000/api/v1
    #[arg(long, env = "PORTAL_API_URL")]
    api_url: Option<String>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show API health and who is signed in
    Status,
    /// Sign in with email and password
    Login {
        #[arg(long, short)]
        username: Option<String>,
    },
    /// Create an account (does not sign in)
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
    },
    /// Forget the stored token
    Logout,
    /// Show the dashboard (requires sign in)
    Dashboard,
    /// Render a site path, e.g. /about or /admin
    Open { path: String },
    /// List the API demo endpoints
    Api {
        /// Call each GET endpoint and show the response
        #[arg(long)]
        probe: bool,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref());
    info!("Portal starting");

    let mut app = App::new(cli.api_url).await?;

    match cli.command.unwrap_or(Command::Status) {
        Command::Status => app.status().await?,
        Command::Login { username } => app.login(username).await?,
        Command::Register { email, full_name } => app.register(email, full_name).await?,
        Command::Logout => app.logout().await?,
        Command::Dashboard => app.open(portal_core::Route::Dashboard.path()).await?,
        Command::Open { path } => app.open(&path).await?,
        Command::Api { probe } => app.api_demo(probe).await?,
    }

    info!("Portal shutting down");
    Ok(())
}
