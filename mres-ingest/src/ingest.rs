//! Ingestion driver
//!
//! `process` is idempotent: a file is looked up at most once per run and a
//! stored record is only ever backfilled. `run` walks a tree, processes every
//! file, then builds descriptors for records lacking a current one.

use crate::aggregator::{Diagnostics, MetadataAggregator};
use crate::descriptor::DescriptorBuilder;
use crate::musicbrainz::MetadataLookup;
use crate::scanner::{FileScanner, ScanError};
use crate::tags::{FileTags, TagReader};
use mres_common::db::{ResolvedFields, TrackRecord, TrackStore};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Run-level errors; per-file problems never surface here
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Store(#[from] mres_common::Error),
}

/// What `process` did with one file
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// First encounter; record inserted
    New { fields: ResolvedFields },
    /// Every field already populated
    ExistingComplete,
    /// Gaps filled from a lookup
    MetadataUpdated { fields: Vec<&'static str> },
    /// Lookup produced nothing new
    NoNewMetadata,
    /// Incomplete record without a recording id
    Unidentified,
}

impl fmt::Display for IngestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestOutcome::New { fields } => write!(
                f,
                "New Added genre={} year={} album_type={}",
                fields.genre.as_deref().unwrap_or("None"),
                fields.year.map(|y| y.to_string()).unwrap_or_else(|| "None".to_string()),
                fields.album_type.as_deref().unwrap_or("None")
            ),
            IngestOutcome::ExistingComplete => write!(f, "Existing Complete"),
            IngestOutcome::MetadataUpdated { fields } => {
                write!(f, "Metadata Updated [{}]", fields.join(", "))
            }
            IngestOutcome::NoNewMetadata => write!(f, "No new metadata from MusicBrainz"),
            IngestOutcome::Unidentified => write!(f, "Unidentified (no recording id)"),
        }
    }
}

/// Outcome of one file plus the diagnostics its lookup produced
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub outcome: IngestOutcome,
    pub diagnostics: Diagnostics,
}

impl FileReport {
    fn new(outcome: IngestOutcome) -> Self {
        Self {
            outcome,
            diagnostics: Diagnostics::default(),
        }
    }
}

/// Totals for one `run`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub files_seen: usize,
    pub new: usize,
    pub existing_complete: usize,
    pub metadata_updated: usize,
    pub no_new_metadata: usize,
    pub unidentified: usize,
    pub failed: usize,
    pub descriptors_built: usize,
    pub descriptor_failures: usize,
    pub diagnostics: Diagnostics,
}

impl RunSummary {
    fn record(&mut self, report: &FileReport) {
        match report.outcome {
            IngestOutcome::New { .. } => self.new += 1,
            IngestOutcome::ExistingComplete => self.existing_complete += 1,
            IngestOutcome::MetadataUpdated { .. } => self.metadata_updated += 1,
            IngestOutcome::NoNewMetadata => self.no_new_metadata += 1,
            IngestOutcome::Unidentified => self.unidentified += 1,
        }
        self.diagnostics.merge(&report.diagnostics);
    }
}

/// Ingestion options
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Search MusicBrainz by artist + title for files without a recording id
    pub search_missing: bool,
    /// Extensions to pick up while walking
    pub extensions: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            search_missing: false,
            extensions: vec!["mp3".to_string()],
        }
    }
}

/// Enriches the track store from a music tree
pub struct Ingestor {
    store: TrackStore,
    aggregator: MetadataAggregator,
    lookup: Arc<dyn MetadataLookup>,
    tags: Arc<dyn TagReader>,
    descriptors: Option<DescriptorBuilder>,
    options: IngestOptions,
}

impl Ingestor {
    pub fn new(
        store: TrackStore,
        aggregator: MetadataAggregator,
        lookup: Arc<dyn MetadataLookup>,
        tags: Arc<dyn TagReader>,
        options: IngestOptions,
    ) -> Self {
        Self {
            store,
            aggregator,
            lookup,
            tags,
            descriptors: None,
            options,
        }
    }

    /// Build descriptors after processing
    pub fn with_descriptors(mut self, descriptors: DescriptorBuilder) -> Self {
        self.descriptors = Some(descriptors);
        self
    }

    /// Process one file
    pub async fn process(&self, path: &Path) -> mres_common::Result<FileReport> {
        let key = path.to_string_lossy();

        match self.store.get(&key).await? {
            None => self.process_new(path, &key).await,
            Some(record) if record.fields.is_complete() => {
                Ok(FileReport::new(IngestOutcome::ExistingComplete))
            }
            Some(record) => self.process_existing(&key, &record).await,
        }
    }

    async fn process_new(&self, path: &Path, key: &str) -> mres_common::Result<FileReport> {
        let mut tags = match self.tags.read(path) {
            Ok(tags) => tags,
            Err(e) => {
                warn!("{}", e);
                FileTags::default()
            }
        };

        if tags.recording_id.is_none() && self.options.search_missing {
            tags.recording_id = self.search_recording_id(path, &tags).await;
        }

        let mut diagnostics = Diagnostics::default();
        let fields = match tags.recording_id.as_deref() {
            Some(recording_id) => {
                let resolution = self.aggregator.resolve(recording_id).await;
                diagnostics = resolution.diagnostics;
                resolution.fields
            }
            None => {
                debug!("No recording id in {}", path.display());
                ResolvedFields::default()
            }
        };

        let record = TrackRecord {
            file_path: key.to_string(),
            track_mbid: tags.recording_id,
            artist_mbid: tags.artist_id,
            release_group_mbid: tags.release_group_id,
            artist: tags.artist,
            title: tags.title,
            fields: fields.clone(),
            embedding: None,
            embedding_version: None,
        };
        self.store.insert_new(&record).await?;

        Ok(FileReport {
            outcome: IngestOutcome::New { fields },
            diagnostics,
        })
    }

    async fn process_existing(
        &self,
        key: &str,
        record: &TrackRecord,
    ) -> mres_common::Result<FileReport> {
        let Some(recording_id) = record.track_mbid.as_deref() else {
            return Ok(FileReport::new(IngestOutcome::Unidentified));
        };

        let resolution = self.aggregator.resolve(recording_id).await;
        let gaps = record.fields.gaps_filled_by(&resolution.fields);

        let outcome = if gaps.is_empty() {
            IngestOutcome::NoNewMetadata
        } else {
            self.store.backfill(key, &gaps).await?;
            IngestOutcome::MetadataUpdated {
                fields: gaps.field_names(),
            }
        };

        Ok(FileReport {
            outcome,
            diagnostics: resolution.diagnostics,
        })
    }

    /// Search by artist + title; a hit is written back into the file
    async fn search_recording_id(&self, path: &Path, tags: &FileTags) -> Option<String> {
        let (Some(artist), Some(title)) = (tags.artist.as_deref(), tags.title.as_deref()) else {
            return None;
        };

        let recording_id = match self.lookup.search_recording(artist, title).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                debug!("No MusicBrainz match for {} - {}", artist, title);
                return None;
            }
            Err(e) => {
                warn!("MBID search failed for {} - {}: {}", artist, title, e);
                return None;
            }
        };

        match self.tags.write_recording_id(path, &recording_id) {
            Ok(()) => info!("Embedded MBID {} into {}", recording_id, path.display()),
            Err(e) => warn!("{}", e),
        }

        Some(recording_id)
    }

    /// Walk `root`, process every matching file, then build descriptors
    pub async fn run(&self, root: &Path) -> Result<RunSummary, IngestError> {
        let files = FileScanner::new(&self.options.extensions).scan(root)?;
        info!("Found {} files under {}", files.len(), root.display());

        let mut summary = RunSummary {
            files_seen: files.len(),
            ..Default::default()
        };

        for path in &files {
            match self.process(path).await {
                Ok(report) => {
                    info!("{} | {}", path.display(), report.outcome);
                    summary.record(&report);
                }
                Err(e) => {
                    warn!("{} | failed: {}", path.display(), e);
                    summary.failed += 1;
                }
            }
        }

        if let Some(descriptors) = &self.descriptors {
            self.build_descriptors(descriptors, &files, &mut summary).await;
        }

        Ok(summary)
    }

    async fn build_descriptors(
        &self,
        descriptors: &DescriptorBuilder,
        files: &[std::path::PathBuf],
        summary: &mut RunSummary,
    ) {
        let version = descriptors.embedding_version();

        for path in files {
            let key = path.to_string_lossy();
            let record = match self.store.get(&key).await {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    warn!("{} | descriptor skipped: {}", key, e);
                    summary.descriptor_failures += 1;
                    continue;
                }
            };

            if !record.needs_descriptor(&version) {
                continue;
            }

            match descriptors.build(&record).await {
                Ok(true) => summary.descriptors_built += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("{} | descriptor failed: {}", key, e);
                    summary.descriptor_failures += 1;
                }
            }
        }

        info!(
            "Descriptors built: {} ({} failed, version {})",
            summary.descriptors_built, summary.descriptor_failures, version
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_log_text() {
        let outcome = IngestOutcome::New {
            fields: ResolvedFields {
                genre: Some("rock".to_string()),
                year: None,
                album_type: Some("Album".to_string()),
            },
        };
        assert_eq!(
            outcome.to_string(),
            "New Added genre=rock year=None album_type=Album"
        );
        assert_eq!(
            IngestOutcome::MetadataUpdated {
                fields: vec!["genre", "year"]
            }
            .to_string(),
            "Metadata Updated [genre, year]"
        );
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let mut summary = RunSummary::default();
        summary.record(&FileReport::new(IngestOutcome::ExistingComplete));
        summary.record(&FileReport {
            outcome: IngestOutcome::NoNewMetadata,
            diagnostics: Diagnostics {
                missing_genre: 1,
                missing_year: 0,
                missing_album_type: 1,
            },
        });
        assert_eq!(summary.existing_complete, 1);
        assert_eq!(summary.no_new_metadata, 1);
        assert_eq!(summary.diagnostics.missing_album_type, 1);
    }
}
