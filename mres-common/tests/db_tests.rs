//! Metadata store and play-history behaviour against real SQLite files

use mres_common::db::{
    init_metadata_store, CacheEntry, RecordingCache, ResolvedFields, SqlitePlayHistory,
    TrackRecord, TrackStore,
};
use mres_common::time::parse_play_timestamp;
use mres_common::Error;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tempfile::TempDir;

async fn store() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let pool = init_metadata_store(&dir.path().join("nested").join("store.db"))
        .await
        .unwrap();
    (dir, pool)
}

async fn play_history_db(path: &Path, rows: &[(&str, i64, Option<&str>)]) {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await.unwrap();
    sqlx::query(
        "CREATE TABLE tracks (path TEXT PRIMARY KEY, play_count INTEGER, last_played TEXT)",
    )
    .execute(&pool)
    .await
    .unwrap();
    for (path, count, last) in rows {
        sqlx::query("INSERT INTO tracks (path, play_count, last_played) VALUES (?, ?, ?)")
            .bind(path)
            .bind(count)
            .bind(last)
            .execute(&pool)
            .await
            .unwrap();
    }
    pool.close().await;
}

#[tokio::test]
async fn test_store_created_with_parent_directory() {
    let (dir, pool) = store().await;
    assert!(dir.path().join("nested").join("store.db").exists());

    let tracks = TrackStore::new(pool.clone());
    assert_eq!(tracks.count().await.unwrap(), 0);
    assert_eq!(RecordingCache::new(pool).count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_legacy_store_gains_new_columns() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("legacy.db");

    {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await.unwrap();
        sqlx::query(
            "CREATE TABLE tracks (file_path TEXT PRIMARY KEY, track_mbid TEXT, artist_mbid TEXT, \
             release_group_mbid TEXT, genre TEXT, year INTEGER, album_type TEXT, embedding TEXT)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("CREATE TABLE mbid_cache (track_mbid TEXT PRIMARY KEY, genre TEXT, year INTEGER, album_type TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO tracks (file_path, genre) VALUES ('/m/a.mp3', 'rock')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO mbid_cache (track_mbid, genre) VALUES ('rec-1', 'rock')")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;
    }

    let pool = init_metadata_store(&db_path).await.unwrap();
    let record = TrackStore::new(pool.clone())
        .get("/m/a.mp3")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.fields.genre.as_deref(), Some("rock"));
    assert_eq!(record.embedding_version, None);

    // Rows cached before payloads were kept are not authoritative
    let entry = RecordingCache::new(pool).get("rec-1").await.unwrap().unwrap();
    assert!(!entry.is_authoritative());
}

#[tokio::test]
async fn test_insert_new_does_not_overwrite() {
    let (_dir, pool) = store().await;
    let tracks = TrackStore::new(pool);

    let mut record = TrackRecord::new("/m/song.mp3");
    record.track_mbid = Some("rec-1".to_string());
    record.fields.genre = Some("rock".to_string());
    assert!(tracks.insert_new(&record).await.unwrap());

    let mut other = TrackRecord::new("/m/song.mp3");
    other.fields.genre = Some("jazz".to_string());
    assert!(!tracks.insert_new(&other).await.unwrap());

    let stored = tracks.get("/m/song.mp3").await.unwrap().unwrap();
    assert_eq!(stored.fields.genre.as_deref(), Some("rock"));
    assert_eq!(stored.track_mbid.as_deref(), Some("rec-1"));
}

#[tokio::test]
async fn test_backfill_only_fills_nulls() {
    let (_dir, pool) = store().await;
    let tracks = TrackStore::new(pool);

    let mut record = TrackRecord::new("/m/song.mp3");
    record.fields.genre = Some("rock".to_string());
    tracks.insert_new(&record).await.unwrap();

    let fresh = ResolvedFields {
        genre: Some("pop".to_string()),
        year: Some(1975),
        album_type: None,
    };
    assert!(tracks.backfill("/m/song.mp3", &fresh).await.unwrap());

    let stored = tracks.get("/m/song.mp3").await.unwrap().unwrap();
    assert_eq!(stored.fields.genre.as_deref(), Some("rock"));
    assert_eq!(stored.fields.year, Some(1975));
    assert_eq!(stored.fields.album_type, None);
}

#[tokio::test]
async fn test_backfill_marks_embedding_stale_only_when_a_field_fills() {
    let (_dir, pool) = store().await;
    let tracks = TrackStore::new(pool);

    let mut record = TrackRecord::new("/m/song.mp3");
    record.fields.genre = Some("rock".to_string());
    tracks.insert_new(&record).await.unwrap();
    tracks
        .store_embedding("/m/song.mp3", &[1.0, 0.5], "ollama:all-minilm")
        .await
        .unwrap();

    // Genre is already set, nothing fills
    let same = ResolvedFields {
        genre: Some("pop".to_string()),
        ..Default::default()
    };
    tracks.backfill("/m/song.mp3", &same).await.unwrap();
    let stored = tracks.get("/m/song.mp3").await.unwrap().unwrap();
    assert!(!stored.needs_descriptor("ollama:all-minilm"));

    let fresh = ResolvedFields {
        year: Some(1975),
        ..Default::default()
    };
    tracks.backfill("/m/song.mp3", &fresh).await.unwrap();
    let stored = tracks.get("/m/song.mp3").await.unwrap().unwrap();
    assert_eq!(stored.embedding, Some(vec![1.0, 0.5]));
    assert_eq!(stored.embedding_version, None);
    assert!(stored.needs_descriptor("ollama:all-minilm"));
}

#[tokio::test]
async fn test_embedding_roundtrip_and_listing() {
    let (_dir, pool) = store().await;
    let tracks = TrackStore::new(pool.clone());

    tracks.insert_new(&TrackRecord::new("/m/b.mp3")).await.unwrap();
    tracks.insert_new(&TrackRecord::new("/m/a.mp3")).await.unwrap();
    tracks.insert_new(&TrackRecord::new("/m/c.mp3")).await.unwrap();

    let vector = vec![0.123_456_79_f32, -2.5, 1e-7];
    tracks
        .store_embedding("/m/b.mp3", &vector, "ollama:all-minilm")
        .await
        .unwrap();
    tracks
        .store_embedding("/m/a.mp3", &[1.0, 0.0, 0.0], "ollama:all-minilm")
        .await
        .unwrap();

    // Corrupt row is skipped, not fatal
    sqlx::query("UPDATE tracks SET embedding = 'garbage' WHERE file_path = '/m/c.mp3'")
        .execute(&pool)
        .await
        .unwrap();

    let embedded = tracks.embedded_tracks().await.unwrap();
    let paths: Vec<&str> = embedded.iter().map(|r| r.file_path.as_str()).collect();
    assert_eq!(paths, vec!["/m/a.mp3", "/m/b.mp3"]);
    assert_eq!(embedded[1].embedding.as_deref(), Some(vector.as_slice()));
    assert_eq!(embedded[1].embedding_version.as_deref(), Some("ollama:all-minilm"));
}

#[tokio::test]
async fn test_cache_put_replaces_fields_and_payload() {
    let (_dir, pool) = store().await;
    let cache = RecordingCache::new(pool);

    let mut entry = CacheEntry {
        track_mbid: "rec-1".to_string(),
        fields: ResolvedFields {
            genre: Some("rock".to_string()),
            year: Some(1975),
            album_type: Some("Album".to_string()),
        },
        recording_json: Some("{\"id\":\"rec-1\"}".to_string()),
    };
    cache.put(&entry).await.unwrap();

    entry.fields = ResolvedFields::default();
    entry.recording_json = Some("{\"id\":\"rec-1\",\"v\":2}".to_string());
    cache.put(&entry).await.unwrap();

    let stored = cache.get("rec-1").await.unwrap().unwrap();
    assert!(stored.fields.is_empty());
    assert!(stored.is_authoritative());
    assert_eq!(stored.recording_json.as_deref(), Some("{\"id\":\"rec-1\",\"v\":2}"));
    assert_eq!(cache.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_play_history_requires_existing_file() {
    let dir = TempDir::new().unwrap();
    let result = SqlitePlayHistory::open(&dir.path().join("missing.db")).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert!(!dir.path().join("missing.db").exists());
}

#[tokio::test]
async fn test_record_play_updates_existing_rows_only() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("music_library.db");
    play_history_db(
        &db_path,
        &[
            ("/m/a.mp3", 3, Some("2024-01-02 03:04:05")),
            ("/m/b.mp3", 0, None),
        ],
    )
    .await;

    let history = SqlitePlayHistory::open(&db_path).await.unwrap();
    assert_eq!(
        history.last_played("/m/a.mp3").await.unwrap(),
        parse_play_timestamp("2024-01-02 03:04:05")
    );
    assert_eq!(history.last_played("/m/b.mp3").await.unwrap(), None);
    assert_eq!(history.last_played("/m/unknown.mp3").await.unwrap(), None);

    let now = parse_play_timestamp("2024-06-01 10:00:00").unwrap();
    assert!(history.record_play("/m/b.mp3", &now).await.unwrap());
    assert!(!history.record_play("/m/unknown.mp3", &now).await.unwrap());

    assert_eq!(history.play_count("/m/b.mp3").await.unwrap(), Some(1));
    assert_eq!(history.last_played("/m/b.mp3").await.unwrap(), Some(now));
    assert_eq!(history.play_count("/m/unknown.mp3").await.unwrap(), None);
}

#[tokio::test]
async fn test_iso_last_played_is_accepted() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("music_library.db");
    play_history_db(&db_path, &[("/m/a.mp3", 1, Some("2024-01-02T03:04:05.250"))]).await;

    let history = SqlitePlayHistory::open(&db_path).await.unwrap();
    let ts = history.last_played("/m/a.mp3").await.unwrap().unwrap();
    assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-02 03:04:05");
}
