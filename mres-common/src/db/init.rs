//! Database initialization
//!
//! The metadata store is created on first use. The play-history database
//! belongs to the playback server and is only ever opened, never created.

use crate::db::table_schemas::sync_all_table_schemas;
use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Open (creating if needed) the metadata store and bring its schema up to date
pub async fn init_metadata_store(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT);

    // Single writer; a small pool is plenty
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new metadata store: {}", db_path.display());
    } else {
        info!("Opened existing metadata store: {}", db_path.display());
    }

    sync_all_table_schemas(&pool).await?;

    Ok(pool)
}

/// Open the playback server's play-history database
///
/// Fails with `NotFound` when the file does not exist.
pub async fn open_play_history_db(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(Error::NotFound(format!(
            "play-history database {}",
            db_path.display()
        )));
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(false)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    info!("Opened play-history database: {}", db_path.display());
    Ok(pool)
}
