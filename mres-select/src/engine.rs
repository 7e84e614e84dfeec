//! Next-track selection
//!
//! Nearest neighbour over descriptor embeddings. Candidates that are the same
//! recording, or whose file name contains the reference title, are excluded;
//! near-duplicates below the distance threshold are dropped; ties go to the
//! track played least recently.

use crate::distance::{
    cosine_distance, display_title, file_name_key, normalize_key, NEAR_DUPLICATE_THRESHOLD,
    TIE_EPSILON,
};
use crate::stores::{MetadataStore, PlayHistoryStore};
use chrono::NaiveDateTime;
use mres_common::db::TrackRecord;
use mres_common::time::now_local;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Selection errors
#[derive(Debug, Error)]
pub enum SelectError {
    #[error("Input track not found: {0}")]
    ReferenceNotFound(String),

    #[error("Input track has no embedding: {0}")]
    MissingEmbedding(String),

    #[error(transparent)]
    Store(#[from] mres_common::Error),
}

/// The chosen next track
#[derive(Debug, Clone, PartialEq)]
pub struct Winner {
    pub path: String,
    pub distance: f64,
    /// Last play before this selection
    pub last_played: Option<NaiveDateTime>,
    /// Whether the play-history row was updated
    pub play_recorded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Winner(Winner),
    NoMatch,
}

/// A scored candidate
#[derive(Debug, Clone)]
struct Scored {
    path: String,
    distance: f64,
    last_played: Option<NaiveDateTime>,
}

impl Scored {
    /// Recency order among tied candidates: never played, then oldest play
    fn played_before(&self, other: &Scored) -> bool {
        match (self.last_played, other.last_played) {
            (None, Some(_)) => true,
            (Some(mine), Some(theirs)) => mine < theirs,
            _ => false,
        }
    }
}

/// Nearest candidate; those within `TIE_EPSILON` of the minimum are ranked by
/// recency, earlier candidates winning full ties
fn pick_winner(candidates: Vec<Scored>) -> Option<Scored> {
    let min = candidates
        .iter()
        .map(|c| c.distance)
        .min_by(|a, b| a.total_cmp(b))?;

    let mut best: Option<Scored> = None;
    for candidate in candidates
        .into_iter()
        .filter(|c| c.distance - min < TIE_EPSILON)
    {
        if best.as_ref().map_or(true, |b| candidate.played_before(b)) {
            best = Some(candidate);
        }
    }
    best
}

/// Picks the next track given the current one
pub struct SelectionEngine<M, H> {
    metadata: M,
    history: H,
}

impl<M: MetadataStore, H: PlayHistoryStore> SelectionEngine<M, H> {
    pub fn new(metadata: M, history: H) -> Self {
        Self { metadata, history }
    }

    /// Select the track to play after `reference_path` and register its play
    pub async fn select_next(&self, reference_path: &str) -> Result<Selection, SelectError> {
        let reference = self
            .metadata
            .track(reference_path)
            .await?
            .ok_or_else(|| SelectError::ReferenceNotFound(reference_path.to_string()))?;

        let Some(reference_embedding) = reference.embedding.as_deref() else {
            return Err(SelectError::MissingEmbedding(reference_path.to_string()));
        };

        let title_key = normalize_key(&display_title(reference.title.as_deref(), reference_path));
        debug!("Reference title key: '{}'", title_key);

        let mut scored = Vec::new();

        for candidate in self.metadata.embedded_tracks().await? {
            if excluded(&reference, &title_key, &candidate) {
                continue;
            }

            let Some(embedding) = candidate.embedding.as_deref() else {
                continue;
            };

            if let (Some(ours), Some(theirs)) =
                (&reference.embedding_version, &candidate.embedding_version)
            {
                if ours != theirs {
                    debug!("Skipping {}: embedding version {}", candidate.file_path, theirs);
                    continue;
                }
            }

            let Some(distance) = cosine_distance(reference_embedding, embedding) else {
                debug!("Skipping {}: incomparable embedding", candidate.file_path);
                continue;
            };

            if distance < NEAR_DUPLICATE_THRESHOLD {
                debug!("Skipping {}: near-duplicate ({:.6})", candidate.file_path, distance);
                continue;
            }

            scored.push(Scored {
                last_played: self.last_played(&candidate.file_path).await,
                path: candidate.file_path,
                distance,
            });
        }

        let Some(best) = pick_winner(scored) else {
            info!("No suitable match for {}", reference_path);
            return Ok(Selection::NoMatch);
        };

        let play_recorded = match self.history.record_play(&best.path, &now_local()).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!("Failed to update play history for {}: {}", best.path, e);
                false
            }
        };

        info!(
            "Selected {} (distance {:.4}) after {}",
            best.path, best.distance, reference_path
        );

        Ok(Selection::Winner(Winner {
            path: best.path,
            distance: best.distance,
            last_played: best.last_played,
            play_recorded,
        }))
    }

    async fn last_played(&self, path: &str) -> Option<NaiveDateTime> {
        match self.history.last_played(path).await {
            Ok(last_played) => last_played,
            Err(e) => {
                warn!("Play history lookup failed for {}: {}", path, e);
                None
            }
        }
    }
}

/// Same file, same recording, or a file name containing the reference title
fn excluded(reference: &TrackRecord, title_key: &str, candidate: &TrackRecord) -> bool {
    if candidate.file_path == reference.file_path {
        return true;
    }

    if let (Some(ours), Some(theirs)) = (&reference.track_mbid, &candidate.track_mbid) {
        if ours == theirs {
            debug!("Skipping {}: same recording", candidate.file_path);
            return true;
        }
    }

    if !title_key.is_empty() && file_name_key(&candidate.file_path).contains(title_key) {
        debug!("Skipping {}: title match", candidate.file_path);
        return true;
    }

    false
}
