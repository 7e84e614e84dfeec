//! Store capabilities used by the selection engine

use async_trait::async_trait;
use chrono::NaiveDateTime;
use mres_common::db::{SqlitePlayHistory, TrackRecord, TrackStore};
use mres_common::Result;

/// Read access to track records
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn track(&self, file_path: &str) -> Result<Option<TrackRecord>>;

    /// Every record with an embedding, in path order
    async fn embedded_tracks(&self) -> Result<Vec<TrackRecord>>;
}

/// Recency lookups and play registration
#[async_trait]
pub trait PlayHistoryStore: Send + Sync {
    async fn last_played(&self, path: &str) -> Result<Option<NaiveDateTime>>;

    /// Count a play; false when the path has no history row
    async fn record_play(&self, path: &str, played_at: &NaiveDateTime) -> Result<bool>;
}

#[async_trait]
impl MetadataStore for TrackStore {
    async fn track(&self, file_path: &str) -> Result<Option<TrackRecord>> {
        self.get(file_path).await
    }

    async fn embedded_tracks(&self) -> Result<Vec<TrackRecord>> {
        TrackStore::embedded_tracks(self).await
    }
}

#[async_trait]
impl PlayHistoryStore for SqlitePlayHistory {
    async fn last_played(&self, path: &str) -> Result<Option<NaiveDateTime>> {
        SqlitePlayHistory::last_played(self, path).await
    }

    async fn record_play(&self, path: &str, played_at: &NaiveDateTime) -> Result<bool> {
        SqlitePlayHistory::record_play(self, path, played_at).await
    }
}

#[async_trait]
impl<T: PlayHistoryStore + ?Sized> PlayHistoryStore for Box<T> {
    async fn last_played(&self, path: &str) -> Result<Option<NaiveDateTime>> {
        (**self).last_played(path).await
    }

    async fn record_play(&self, path: &str, played_at: &NaiveDateTime) -> Result<bool> {
        (**self).record_play(path, played_at).await
    }
}

/// Stand-in when the play-history database is unavailable
///
/// Every track reads as never played and no play is recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedPlayHistory;

#[async_trait]
impl PlayHistoryStore for DetachedPlayHistory {
    async fn last_played(&self, _path: &str) -> Result<Option<NaiveDateTime>> {
        Ok(None)
    }

    async fn record_play(&self, _path: &str, _played_at: &NaiveDateTime) -> Result<bool> {
        Ok(false)
    }
}
