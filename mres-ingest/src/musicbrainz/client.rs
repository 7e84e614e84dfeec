//! MusicBrainz API client with rate limiting

use super::types::{MbArtist, MbRecordingSearch, MbTag};
use super::{MbError, MetadataLookup, RecordingPayload};
use async_trait::async_trait;
use mres_common::config::MusicBrainzConfig;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a minimum spacing between HTTP requests
pub(crate) struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    /// Wait if necessary to comply with rate limit
    pub(crate) async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// MusicBrainz WS/2 client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl MusicBrainzClient {
    pub fn new(config: &MusicBrainzConfig) -> Result<Self, MbError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MbError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::new(Duration::from_millis(config.min_request_interval_ms)),
        })
    }

    /// GET `{base_url}/{path}` and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        entity: &str,
    ) -> Result<T, MbError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(url = %url, "Querying MusicBrainz API");

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .query(&[("fmt", "json")])
            .send()
            .await
            .map_err(|e| MbError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MbError::NotFound(entity.to_string()));
        }

        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(MbError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MbError::Api(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| MbError::Parse(e.to_string()))
    }
}

#[async_trait]
impl MetadataLookup for MusicBrainzClient {
    async fn lookup_recording(&self, recording_id: &str) -> Result<RecordingPayload, MbError> {
        let raw: serde_json::Value = self
            .get_json(
                &format!(
                    "recording/{}?inc=tags+releases+release-groups+artist-credits",
                    recording_id
                ),
                &[],
                recording_id,
            )
            .await?;

        let payload = RecordingPayload::from_raw(raw)?;

        tracing::debug!(
            mbid = %recording_id,
            title = %payload.recording.title.as_deref().unwrap_or("Unknown"),
            releases = payload.recording.releases.len(),
            "Retrieved recording from MusicBrainz"
        );

        Ok(payload)
    }

    async fn lookup_artist_tags(&self, artist_id: &str) -> Result<Vec<MbTag>, MbError> {
        let artist: MbArtist = self
            .get_json(&format!("artist/{}?inc=tags", artist_id), &[], artist_id)
            .await?;
        Ok(artist.tags)
    }

    async fn search_recording(&self, artist: &str, title: &str) -> Result<Option<String>, MbError> {
        let query = format!(
            "artist:\"{}\" AND recording:\"{}\"",
            escape_lucene(artist),
            escape_lucene(title)
        );

        let result: MbRecordingSearch = self
            .get_json("recording", &[("query", query.as_str()), ("limit", "1")], title)
            .await?;

        Ok(result.recordings.into_iter().next().map(|hit| {
            tracing::info!(
                mbid = %hit.id,
                score = hit.score.unwrap_or_default(),
                "Found MBID via search for {} - {}",
                artist,
                title
            );
            hit.id
        }))
    }
}

/// Escape characters that are special inside a quoted Lucene phrase
fn escape_lucene(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
