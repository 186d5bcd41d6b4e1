mod activity;
mod api;
mod app;
mod cache;
mod commands;
mod config;
mod event;
mod session;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "medicure")]
#[command(about = "A terminal dashboard for MediCure session data")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/medicure/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// User id to load, overriding the config file
  #[arg(short, long)]
  user: Option<String>,

  /// Log file (default: $XDG_DATA_HOME/medicure/medicure.log)
  #[arg(long)]
  log_file: Option<PathBuf>,
}

/// Log to a file since the terminal belongs to the UI.
///
/// Use RUST_LOG to control the level (e.g. RUST_LOG=medicure=debug).
fn init_tracing(path: &Path) -> Result<WorkerGuard> {
  let dir = path
    .parent()
    .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;
  let file_name = path
    .file_name()
    .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;
  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(filter)
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let log_path = match args.log_file {
    Some(path) => path,
    None => config::Config::default_log_path()?,
  };
  let _log_guard = init_tracing(&log_path)?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override user if specified on command line
  let config = if let Some(user_id) = args.user {
    config::Config {
      api: config::ApiConfig {
        user_id,
        ..config.api
      },
      ..config
    }
  } else {
    config
  };

  tracing::info!(api = %config.api.url, "medicure starting");

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  tracing::info!("medicure exiting");
  Ok(())
}
