//! mres-select - pick the next track for the playback server
//!
//! Prints `<path> (cosine distance: D, last played: T)` for the chosen track,
//! or `No suitable match found.`

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use mres_common::config::{init_tracing, load_toml_config, resolve_play_history_path};
use mres_common::db::{init_metadata_store, SqlitePlayHistory, TrackStore};
use mres_select::{
    DetachedPlayHistory, PlayHistoryStore, SelectError, Selection, SelectionEngine,
};

/// Command-line arguments for mres-select
#[derive(Parser, Debug)]
#[command(name = "mres-select")]
#[command(about = "Select the next track by descriptor similarity")]
#[command(version)]
struct Args {
    /// Track currently playing, as stored in the metadata store
    current_file: String,

    /// Metadata store written by mres-ingest
    db_path: PathBuf,

    /// Play-history database (default: $MRES_PLAY_HISTORY_DB, config, then the playback server's)
    #[arg(long, value_name = "FILE")]
    history_db: Option<PathBuf>,

    /// Config file (default: $MRES_CONFIG or ~/.config/mres/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = load_toml_config(args.config.as_deref())?;
    init_tracing(&config.logging);

    info!(
        "Starting mres-select v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if !args.db_path.exists() {
        anyhow::bail!("Metadata store not found: {}", args.db_path.display());
    }

    let pool = init_metadata_store(&args.db_path)
        .await
        .with_context(|| format!("Failed to open metadata store {}", args.db_path.display()))?;
    let store = TrackStore::new(pool);

    let history_path = resolve_play_history_path(args.history_db.as_deref(), &config);
    let history: Box<dyn PlayHistoryStore> = match SqlitePlayHistory::open(&history_path).await {
        Ok(history) => Box::new(history),
        Err(e) => {
            warn!("Play history unavailable ({}); treating all tracks as never played", e);
            Box::new(DetachedPlayHistory)
        }
    };

    let engine = SelectionEngine::new(store, history);

    match engine.select_next(&args.current_file).await {
        Ok(Selection::Winner(winner)) => {
            let last_played = winner
                .last_played
                .map(|ts| ts.format("%Y-%m-%dT%H:%M:%S").to_string())
                .unwrap_or_else(|| "never".to_string());
            println!(
                "{} (cosine distance: {:.4}, last played: {})",
                winner.path, winner.distance, last_played
            );
            Ok(ExitCode::SUCCESS)
        }
        Ok(Selection::NoMatch) => {
            println!("No suitable match found.");
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ (SelectError::ReferenceNotFound(_) | SelectError::MissingEmbedding(_))) => {
            eprintln!("Input track not found or missing embedding: {}", args.current_file);
            warn!("{}", e);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}
