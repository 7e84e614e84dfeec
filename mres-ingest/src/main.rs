//! mres-ingest - enrich a music tree into the metadata store
//!
//! Reads MusicBrainz identifiers from each file's tags, resolves genre, year
//! and album type, and stores a semantic descriptor per track.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use mres_common::config::{init_tracing, load_toml_config, resolve_store_path};
use mres_common::db::{init_metadata_store, RecordingCache, TrackStore};
use mres_ingest::{
    DescriptorBuilder, Id3TagReader, IngestOptions, Ingestor, MetadataAggregator,
    MusicBrainzClient, OllamaEmbedder,
};

/// Command-line arguments for mres-ingest
#[derive(Parser, Debug)]
#[command(name = "mres-ingest")]
#[command(about = "Enrich a music tree with MusicBrainz metadata and descriptors")]
#[command(version)]
struct Args {
    /// Root of the music tree
    music_dir: PathBuf,

    /// Metadata store (default: $MRES_DB_PATH, config, then the data dir)
    db_path: Option<PathBuf>,

    /// Search MusicBrainz by artist and title when a file has no recording id
    #[arg(long)]
    search_missing: bool,

    /// Skip building descriptor embeddings
    #[arg(long)]
    skip_embeddings: bool,

    /// Config file (default: $MRES_CONFIG or ~/.config/mres/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_toml_config(args.config.as_deref())?;
    init_tracing(&config.logging);

    info!(
        "Starting mres-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let db_path = resolve_store_path(args.db_path.as_deref(), &config);
    info!("Metadata store: {}", db_path.display());

    let pool = init_metadata_store(&db_path)
        .await
        .with_context(|| format!("Failed to open metadata store {}", db_path.display()))?;
    let store = TrackStore::new(pool.clone());

    let lookup = Arc::new(
        MusicBrainzClient::new(&config.musicbrainz).context("Failed to create MusicBrainz client")?,
    );
    let aggregator = MetadataAggregator::new(
        lookup.clone(),
        RecordingCache::new(pool),
        Duration::from_millis(config.musicbrainz.pacing_ms),
    );

    let options = IngestOptions {
        search_missing: args.search_missing,
        extensions: config.ingest.extensions.clone(),
    };

    let mut ingestor = Ingestor::new(
        store.clone(),
        aggregator,
        lookup,
        Arc::new(Id3TagReader),
        options,
    );

    if args.skip_embeddings {
        info!("Descriptor embeddings disabled");
    } else {
        let embedder = OllamaEmbedder::new(&config.embedding)
            .context("Failed to create embedding client")?;
        ingestor = ingestor.with_descriptors(DescriptorBuilder::new(Arc::new(embedder), store));
    }

    let summary = ingestor
        .run(&args.music_dir)
        .await
        .with_context(|| format!("Failed to ingest {}", args.music_dir.display()))?;

    info!(
        "Processed {} files: {} new, {} complete, {} updated, {} unchanged, {} unidentified, {} failed",
        summary.files_seen,
        summary.new,
        summary.existing_complete,
        summary.metadata_updated,
        summary.no_new_metadata,
        summary.unidentified,
        summary.failed
    );

    println!("\nDiagnostics summary:");
    println!("{}", summary.diagnostics);

    Ok(())
}
