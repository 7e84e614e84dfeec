//! Play history of the playback server
//!
//! The `tracks(path, play_count, last_played)` table is owned by the playback
//! server. Rows are read and updated here, never created.

use crate::db::init::open_play_history_db;
use crate::time::{format_play_timestamp, parse_play_timestamp};
use crate::Result;
use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, warn};

/// Play-history table accessed over SQLite
#[derive(Debug, Clone)]
pub struct SqlitePlayHistory {
    pool: SqlitePool,
}

impl SqlitePlayHistory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open an existing play-history database file
    pub async fn open(db_path: &Path) -> Result<Self> {
        Ok(Self::new(open_play_history_db(db_path).await?))
    }

    /// Last play time of `path`; absent rows and unparsable values are `None`
    pub async fn last_played(&self, path: &str) -> Result<Option<NaiveDateTime>> {
        let raw: Option<Option<String>> =
            sqlx::query_scalar("SELECT last_played FROM tracks WHERE path = ?")
                .bind(path)
                .fetch_optional(&self.pool)
                .await?;

        let Some(raw) = raw.flatten() else {
            return Ok(None);
        };

        let parsed = parse_play_timestamp(&raw);
        if parsed.is_none() {
            warn!("Unparsable last_played '{}' for {}", raw, path);
        }
        Ok(parsed)
    }

    /// Count one play at `played_at` for an existing row
    ///
    /// Returns false when the path has no play-history row.
    pub async fn record_play(&self, path: &str, played_at: &NaiveDateTime) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tracks
            SET play_count = COALESCE(play_count, 0) + 1,
                last_played = ?
            WHERE path = ?
            "#,
        )
        .bind(format_play_timestamp(played_at))
        .bind(path)
        .execute(&self.pool)
        .await?;

        let updated = result.rows_affected() > 0;
        if !updated {
            debug!("No play-history row for {}; not registered", path);
        }
        Ok(updated)
    }

    pub async fn play_count(&self, path: &str) -> Result<Option<i64>> {
        let count: Option<Option<i64>> =
            sqlx::query_scalar("SELECT play_count FROM tracks WHERE path = ?")
                .bind(path)
                .fetch_optional(&self.pool)
                .await?;
        Ok(count.flatten())
    }
}
