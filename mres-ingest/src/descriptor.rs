//! Semantic descriptors
//!
//! A descriptor is the text `artist: ..; title: ..; genre: ..; year: ..;
//! album_type: ..` (absent fields omitted) turned into a vector by an
//! embedding function. Vectors are stored with the function's version so a
//! model change triggers re-embedding.

use async_trait::async_trait;
use mres_common::config::EmbeddingConfig;
use mres_common::db::{TrackRecord, TrackStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Embedding errors
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Embedding service error: {0}")]
    Service(String),

    #[error("Embedding service returned an empty vector")]
    EmptyVector,

    #[error("Store error: {0}")]
    Store(#[from] mres_common::Error),
}

/// Text to fixed-length vector
#[async_trait]
pub trait EmbeddingFunction: Send + Sync {
    /// Identifies the model; stored next to every vector
    fn version(&self) -> String;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Client for an Ollama-compatible `/api/embeddings` endpoint
pub struct OllamaEmbedder {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbedError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbedError::Service(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingFunction for OllamaEmbedder {
    fn version(&self) -> String {
        format!("ollama:{}", self.model)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| EmbedError::Service(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbedError::Service(format!("HTTP {}: {}", status, error_text)));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::Service(e.to_string()))?;

        if body.embedding.is_empty() {
            return Err(EmbedError::EmptyVector);
        }
        Ok(body.embedding)
    }
}

/// Canonical descriptor text of a record
pub fn descriptor_text(record: &TrackRecord) -> String {
    let year = record.fields.year.map(|y| y.to_string());
    let parts = [
        ("artist", record.artist.as_deref()),
        ("title", record.title.as_deref()),
        ("genre", record.fields.genre.as_deref()),
        ("year", year.as_deref()),
        ("album_type", record.fields.album_type.as_deref()),
    ];

    parts
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .filter(|v| !v.trim().is_empty())
                .map(|v| format!("{}: {}", key, v))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Builds and stores descriptor embeddings
pub struct DescriptorBuilder {
    embedder: Arc<dyn EmbeddingFunction>,
    store: TrackStore,
}

impl DescriptorBuilder {
    pub fn new(embedder: Arc<dyn EmbeddingFunction>, store: TrackStore) -> Self {
        Self { embedder, store }
    }

    pub fn embedding_version(&self) -> String {
        self.embedder.version()
    }

    /// Embed `record` and persist the vector
    ///
    /// Returns false when there is nothing to describe.
    pub async fn build(&self, record: &TrackRecord) -> Result<bool, EmbedError> {
        let text = descriptor_text(record);
        if text.is_empty() {
            debug!("No descriptor fields for {}", record.file_path);
            return Ok(false);
        }

        let embedding = self.embedder.embed(&text).await?;
        self.store
            .store_embedding(&record.file_path, &embedding, &self.embedder.version())
            .await?;

        debug!(
            "Stored {}-dimensional descriptor for {}: {}",
            embedding.len(),
            record.file_path,
            text
        );
        Ok(true)
    }
}
