//! projdesk - a command-line client for the projdesk project tracker.
//!
//! Sign in, keep the session alive across runs, and create projects.

mod commands;
mod prompt;

use std::io;
use std::path::Path;

use anyhow::Result;
use projdesk_core::Config;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log file name prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "projdesk.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr and, when a cache directory is available, to a daily
/// file there. The returned guard flushes the file writer on drop.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
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

fn print_usage() {
    println!(
        "Usage: projdesk <command>

Commands:
  login            Sign in and store the session
  register         Create a new account
  logout           Forget the stored session
  status           Check whether the stored session is still valid
  options          List project statuses and priorities
  create-project   Create a project interactively
  help             Show this message

Environment:
  PROJDESK_API_URL    API base URL (default {})
  PROJDESK_USERNAME   Username for non-interactive login
  PROJDESK_PASSWORD   Password for non-interactive login
  RUST_LOG            Log filter (default warn)",
        projdesk_core::config::DEFAULT_API_BASE_URL
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Help,
    Login,
    Register,
    Logout,
    Status,
    Options,
    CreateProject,
}

impl Command {
    /// Parse the first argument; a missing one means help.
    fn parse(arg: Option<&str>) -> Option<Self> {
        match arg.unwrap_or("help") {
            "help" | "--help" | "-h" => Some(Command::Help),
            "login" => Some(Command::Login),
            "register" => Some(Command::Register),
            "logout" => Some(Command::Logout),
            "status" => Some(Command::Status),
            "options" => Some(Command::Options),
            "create-project" => Some(Command::CreateProject),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let (mut config, config_error) = match Config::load() {
        Ok(c) => (c, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let log_guard = init_tracing(config.cache_dir().ok().as_deref());
    if let Some(e) = config_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    let args: Vec<String> = std::env::args().collect();
    let arg = args.get(1).map(String::as_str);
    let Some(command) = Command::parse(arg) else {
        warn!(command = arg.unwrap_or_default(), "Unknown command");
        eprintln!("Unknown command: {}\n", arg.unwrap_or_default());
        print_usage();
        // process::exit skips destructors; flush the log file first
        drop(log_guard);
        std::process::exit(2);
    };

    if command == Command::Help {
        print_usage();
        return Ok(());
    }

    let manager = projdesk_core::session_manager(&config)?;
    info!(?command, api = manager.api().base_url(), "projdesk starting");

    let result = match command {
        Command::Help => Ok(()),
        Command::Login => commands::login(&manager, &mut config).await,
        Command::Register => commands::register(&manager).await,
        Command::Logout => {
            commands::logout(&manager);
            Ok(())
        }
        Command::Status => commands::status(&manager, &config).await,
        Command::Options => commands::options(&manager).await,
        Command::CreateProject => commands::create_project(&manager).await,
    };

    if let Err(ref e) = result {
        warn!(error = %e, ?command, "Command failed");
    }
    drop(log_guard);
    result
}
