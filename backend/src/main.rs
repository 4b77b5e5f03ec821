//! Main entry point for the Kayease admin console.
//!
//! Parses the command line, initializes logging and configuration, opens the
//! cookie jar and local store under the data directory, and dispatches to
//! the authentication handlers.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use adapters::SystemClock;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kayease_admin::auth::{handlers, Session, SessionManager};
use kayease_admin::config::Config;
use kayease_admin::services::{ExpiryHandler, ExpiryWatcher};

/// Kayease admin console - sign in to and guard the back office
#[derive(Parser)]
#[command(name = "kayease-admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value_os_t = Config::default_path())]
    config: PathBuf,

    /// Directory holding the cookie jar and local store
    #[arg(short, long, default_value_os_t = Config::default_data_dir())]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in as the operator
    Login {
        #[arg(long)]
        email: String,

        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// End the current session
    Logout,

    /// Show whether a valid session exists
    Status {
        /// Print the raw status object
        #[arg(long)]
        json: bool,
    },

    /// Enter a page through the route guard
    Open {
        /// Page path, e.g. /admin/dashboard
        path: String,
    },

    /// Keep checking the session until it ends
    Watch {
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
    },

    /// Generate a default configuration file
    InitConfig {
        /// Output path (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Tells the operator their session is over.
struct AnnounceExpiry;

#[async_trait]
impl ExpiryHandler for AnnounceExpiry {
    async fn on_expired(&self, last_seen: &Session) {
        println!(
            "Session for {} has ended; sign in again to continue",
            last_seen.email
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        config,
        data_dir,
        verbose,
        command,
    } = Cli::parse();
    init_logging(verbose);

    run(command, &config, &data_dir).await
}

async fn run(command: Commands, config_path: &Path, data_dir: &Path) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::InitConfig { output } => init_config(output.as_deref(), &mut out)?,
        Commands::Login { email, password } => {
            let mut manager = open_manager(config_path, data_dir)?;
            let password = match password {
                Some(password) => password,
                None => {
                    write!(out, "Password: ")?;
                    out.flush()?;
                    handlers::read_password(io::stdin().lock())?
                }
            };
            if !handlers::login(&mut manager, &email, &password, &mut out)? {
                bail!("login rejected for {email}");
            }
        }
        Commands::Logout => handlers::logout(&mut open_manager(config_path, data_dir)?, &mut out)?,
        Commands::Status { json } => {
            handlers::status(&mut open_manager(config_path, data_dir)?, json, &mut out)?;
        }
        Commands::Open { path } => {
            handlers::open(&mut open_manager(config_path, data_dir)?, &path, &mut out)?;
        }
        Commands::Watch { interval_secs } => {
            drop(out);
            let manager = open_manager(config_path, data_dir)?;
            let period = Duration::from_secs(interval_secs.max(1));
            let mut watcher = ExpiryWatcher::new(manager, period);
            info!(interval_secs, "watching admin session");
            if watcher.run(&AnnounceExpiry).await.is_none() {
                println!("Not authenticated");
            }
        }
    }

    Ok(())
}

fn open_manager(config_path: &Path, data_dir: &Path) -> Result<SessionManager> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    SessionManager::open(&config, data_dir, Arc::new(SystemClock))
        .with_context(|| format!("Failed to open session stores in {}", data_dir.display()))
}

/// Logs go to stderr so command output stays clean on stdout.
fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

fn init_config<W: Write>(output: Option<&Path>, out: &mut W) -> Result<()> {
    let rendered = Config::default().to_toml()?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote default configuration to {}", path.display());
        }
        None => write!(out, "{rendered}")?,
    }
    Ok(())
}
