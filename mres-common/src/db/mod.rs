//! Store access: metadata store tables and the playback server's play history

pub mod init;
pub mod models;
pub mod play_history;
pub mod recording_cache;
pub mod schema_sync;
pub mod table_schemas;
pub mod tracks;

pub use init::*;
pub use models::*;
pub use play_history::SqlitePlayHistory;
pub use recording_cache::RecordingCache;
pub use tracks::TrackStore;
