//! Track record persistence
//!
//! Records are inserted once per file and afterwards only backfilled:
//! a populated `genre`, `year` or `album_type` is never overwritten.

use crate::db::models::{ResolvedFields, TrackRecord};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::warn;

const TRACK_COLUMNS: &str = "file_path, track_mbid, artist_mbid, release_group_mbid, \
     artist, title, genre, year, album_type, embedding, embedding_version";

/// Access to the `tracks` table of the metadata store
#[derive(Debug, Clone)]
pub struct TrackStore {
    pool: SqlitePool,
}

impl TrackStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load one record by file path
    pub async fn get(&self, file_path: &str) -> Result<Option<TrackRecord>> {
        let sql = format!("SELECT {} FROM tracks WHERE file_path = ?", TRACK_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(file_path)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| record_from_row(&row)))
    }

    /// Insert a first-encounter record
    ///
    /// Returns false when a record for the path already exists; the existing
    /// row is left untouched.
    pub async fn insert_new(&self, record: &TrackRecord) -> Result<bool> {
        let embedding = record.embedding.as_deref().map(encode_embedding).transpose()?;

        let result = sqlx::query(
            r#"
            INSERT INTO tracks (
                file_path, track_mbid, artist_mbid, release_group_mbid,
                artist, title, genre, year, album_type, embedding, embedding_version
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(file_path) DO NOTHING
            "#,
        )
        .bind(&record.file_path)
        .bind(&record.track_mbid)
        .bind(&record.artist_mbid)
        .bind(&record.release_group_mbid)
        .bind(&record.artist)
        .bind(&record.title)
        .bind(&record.fields.genre)
        .bind(record.fields.year)
        .bind(&record.fields.album_type)
        .bind(embedding)
        .bind(&record.embedding_version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fill null fields from `fields`; populated columns keep their value
    ///
    /// When a field is filled the stored embedding no longer describes the
    /// record, so its version is cleared and the next descriptor pass
    /// rebuilds it. Returns true when the statement touched the row.
    pub async fn backfill(&self, file_path: &str, fields: &ResolvedFields) -> Result<bool> {
        if fields.is_empty() {
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE tracks SET
                embedding_version = CASE
                    WHEN (genre IS NULL AND ? IS NOT NULL)
                      OR (year IS NULL AND ? IS NOT NULL)
                      OR (album_type IS NULL AND ? IS NOT NULL)
                    THEN NULL
                    ELSE embedding_version
                END,
                genre = COALESCE(genre, ?),
                year = COALESCE(year, ?),
                album_type = COALESCE(album_type, ?)
            WHERE file_path = ?
            "#,
        )
        .bind(&fields.genre)
        .bind(fields.year)
        .bind(&fields.album_type)
        .bind(&fields.genre)
        .bind(fields.year)
        .bind(&fields.album_type)
        .bind(file_path)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Store (or replace) the descriptor embedding of a record
    pub async fn store_embedding(
        &self,
        file_path: &str,
        embedding: &[f32],
        embedding_version: &str,
    ) -> Result<bool> {
        let encoded = encode_embedding(embedding)?;
        let result = sqlx::query(
            "UPDATE tracks SET embedding = ?, embedding_version = ? WHERE file_path = ?",
        )
        .bind(encoded)
        .bind(embedding_version)
        .bind(file_path)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All records, ordered by path
    pub async fn all(&self) -> Result<Vec<TrackRecord>> {
        let sql = format!("SELECT {} FROM tracks ORDER BY file_path", TRACK_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    /// Records that carry an embedding, ordered by path
    pub async fn embedded_tracks(&self) -> Result<Vec<TrackRecord>> {
        let sql = format!(
            "SELECT {} FROM tracks WHERE embedding IS NOT NULL ORDER BY file_path",
            TRACK_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(record_from_row)
            .filter(|record| record.embedding.is_some())
            .collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn record_from_row(row: &SqliteRow) -> TrackRecord {
    let file_path: String = row.get("file_path");
    let raw_embedding: Option<String> = row.get("embedding");

    let embedding = raw_embedding.and_then(|raw| match decode_embedding(&raw) {
        Ok(values) => Some(values),
        Err(e) => {
            warn!("Ignoring unreadable embedding for {}: {}", file_path, e);
            None
        }
    });

    TrackRecord {
        track_mbid: row.get("track_mbid"),
        artist_mbid: row.get("artist_mbid"),
        release_group_mbid: row.get("release_group_mbid"),
        artist: row.get("artist"),
        title: row.get("title"),
        fields: ResolvedFields {
            genre: row.get("genre"),
            year: row.get("year"),
            album_type: row.get("album_type"),
        },
        embedding,
        embedding_version: row.get("embedding_version"),
        file_path,
    }
}

/// Serialize an embedding as a JSON array
pub fn encode_embedding(values: &[f32]) -> Result<String> {
    Ok(serde_json::to_string(values)?)
}

/// Parse a stored JSON array embedding
pub fn decode_embedding(raw: &str) -> Result<Vec<f32>> {
    Ok(serde_json::from_str(raw)?)
}
