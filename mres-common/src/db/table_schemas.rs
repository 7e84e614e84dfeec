//! Table schema definitions
//!
//! Single source of truth for the metadata store layout. Columns added after
//! the first release (`artist`, `title`, `embedding_version`,
//! `recording_json`) are picked up by schema sync on stores that predate them.

use crate::db::schema_sync::{ColumnDefinition, SchemaSync, TableSchema};
use crate::Result;
use sqlx::SqlitePool;

/// Per-file track records
pub struct TracksTableSchema;

impl TableSchema for TracksTableSchema {
    fn table_name() -> &'static str {
        "tracks"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("file_path", "TEXT").primary_key(),
            ColumnDefinition::new("track_mbid", "TEXT"),
            ColumnDefinition::new("artist_mbid", "TEXT"),
            ColumnDefinition::new("release_group_mbid", "TEXT"),
            ColumnDefinition::new("genre", "TEXT"),
            ColumnDefinition::new("year", "INTEGER"),
            ColumnDefinition::new("album_type", "TEXT"),
            // JSON array of the embedding values
            ColumnDefinition::new("embedding", "TEXT"),
            ColumnDefinition::new("artist", "TEXT"),
            ColumnDefinition::new("title", "TEXT"),
            ColumnDefinition::new("embedding_version", "TEXT"),
        ]
    }
}

/// Per-recording aggregation cache
pub struct MbidCacheTableSchema;

impl TableSchema for MbidCacheTableSchema {
    fn table_name() -> &'static str {
        "mbid_cache"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("track_mbid", "TEXT").primary_key(),
            ColumnDefinition::new("genre", "TEXT"),
            ColumnDefinition::new("year", "INTEGER"),
            ColumnDefinition::new("album_type", "TEXT"),
            // Raw lookup payload; presence makes the row authoritative
            ColumnDefinition::new("recording_json", "TEXT"),
        ]
    }
}

/// Create or upgrade every metadata store table
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<()> {
    SchemaSync::ensure_table::<TracksTableSchema>(pool).await?;
    SchemaSync::ensure_table::<MbidCacheTableSchema>(pool).await?;
    Ok(())
}
