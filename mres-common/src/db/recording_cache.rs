//! Per-recording aggregation cache (`mbid_cache`)

use crate::db::models::{CacheEntry, ResolvedFields};
use crate::Result;
use sqlx::{Row, SqlitePool};

/// Get-or-create access to the recording cache
#[derive(Debug, Clone)]
pub struct RecordingCache {
    pool: SqlitePool,
}

impl RecordingCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, track_mbid: &str) -> Result<Option<CacheEntry>> {
        let row = sqlx::query(
            r#"
            SELECT track_mbid, genre, year, album_type, recording_json
            FROM mbid_cache
            WHERE track_mbid = ?
            "#,
        )
        .bind(track_mbid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| CacheEntry {
            track_mbid: row.get("track_mbid"),
            fields: ResolvedFields {
                genre: row.get("genre"),
                year: row.get("year"),
                album_type: row.get("album_type"),
            },
            recording_json: row.get("recording_json"),
        }))
    }

    /// Create the entry, or replace fields and payload together
    pub async fn put(&self, entry: &CacheEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO mbid_cache (track_mbid, genre, year, album_type, recording_json)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(track_mbid) DO UPDATE SET
                genre = excluded.genre,
                year = excluded.year,
                album_type = excluded.album_type,
                recording_json = excluded.recording_json
            "#,
        )
        .bind(&entry.track_mbid)
        .bind(&entry.fields.genre)
        .bind(entry.fields.year)
        .bind(&entry.fields.album_type)
        .bind(&entry.recording_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mbid_cache")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
