//! rpsync - recently-played sync job
//!
//! Running the binary performs exactly one sync pass: read the watermark,
//! refresh the access token, fetch new plays, store them. Scheduling and
//! retries belong to whatever invokes it.

use anyhow::{Context, Result};
use clap::Parser;
use rpsync_common::config::{database_path, load_toml_config, resolve_root_folder, ROOT_FOLDER_ENV};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for rpsync (all optional)
#[derive(Parser, Debug)]
#[command(name = "rpsync")]
#[command(about = "Sync Spotify recently-played tracks into a local SQLite database")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "RPSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the database (overrides RPSYNC_ROOT_FOLDER and the config file)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let dotenv_path = dotenvy::dotenv().ok();

    let args = Args::parse();

    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting rpsync {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = dotenv_path {
        info!("Loaded environment from {}", path.display());
    }

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &toml_config);
    let db_path = database_path(&root_folder, &toml_config);
    info!("Database: {}", db_path.display());

    let report = rpsync::sync_once(&toml_config, &db_path)
        .await
        .context("Sync run failed")?;

    info!(
        "Done: {} fetched, {} inserted (after {})",
        report.fetched, report.inserted, report.watermark_ms
    );

    Ok(())
}
