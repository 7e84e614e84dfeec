//! MusicBrainz metadata lookup

mod client;
pub mod types;

pub use client::MusicBrainzClient;

use async_trait::async_trait;
use thiserror::Error;
use types::{MbRecording, MbTag};

/// Lookup errors
///
/// All of these degrade to "field unresolved" in the aggregator.
#[derive(Debug, Error)]
pub enum MbError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// A recording lookup result: the verbatim JSON plus its typed view
#[derive(Debug, Clone)]
pub struct RecordingPayload {
    pub raw: serde_json::Value,
    pub recording: MbRecording,
}

impl RecordingPayload {
    pub fn from_raw(raw: serde_json::Value) -> Result<Self, MbError> {
        let recording =
            serde_json::from_value(raw.clone()).map_err(|e| MbError::Parse(e.to_string()))?;
        Ok(Self { raw, recording })
    }

    /// Compact JSON for the recording cache
    pub fn to_json(&self) -> String {
        self.raw.to_string()
    }
}

/// External metadata lookup service
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Recording with tags, releases, release groups and artist credits
    async fn lookup_recording(&self, recording_id: &str) -> Result<RecordingPayload, MbError>;

    /// Artist-level tags
    async fn lookup_artist_tags(&self, artist_id: &str) -> Result<Vec<MbTag>, MbError>;

    /// Best recording id for an artist and title, if any
    async fn search_recording(&self, artist: &str, title: &str) -> Result<Option<String>, MbError>;
}
