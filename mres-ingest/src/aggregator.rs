//! Metadata aggregation
//!
//! Turns one recording lookup into stable `(genre, year, album_type)` values.
//! Results are cached per recording id; a cached raw payload is final even
//! when every field resolved to unknown.

use crate::musicbrainz::types::{MbRecording, MbTag};
use crate::musicbrainz::{MetadataLookup, RecordingPayload};
use mres_common::db::{CacheEntry, RecordingCache, ResolvedFields};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-field counts of unresolved values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub missing_genre: u64,
    pub missing_year: u64,
    pub missing_album_type: u64,
}

impl Diagnostics {
    /// Count each field left unresolved by one aggregation
    pub fn for_unresolved(fields: &ResolvedFields) -> Self {
        Self {
            missing_genre: fields.genre.is_none() as u64,
            missing_year: fields.year.is_none() as u64,
            missing_album_type: fields.album_type.is_none() as u64,
        }
    }

    pub fn merge(&mut self, other: &Diagnostics) {
        self.missing_genre += other.missing_genre;
        self.missing_year += other.missing_year;
        self.missing_album_type += other.missing_album_type;
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Missing genre: {}", self.missing_genre)?;
        writeln!(f, "Missing year: {}", self.missing_year)?;
        write!(f, "Missing album_type: {}", self.missing_album_type)
    }
}

/// How a resolution was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    CacheHit,
    Fresh,
    LookupFailed,
}

/// Result of one `resolve` call
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub fields: ResolvedFields,
    pub diagnostics: Diagnostics,
    pub outcome: ResolveOutcome,
}

/// Weight per key, remembering first-seen order
///
/// The winner is the first key reaching the maximum weight.
#[derive(Debug, Clone, Default)]
pub struct WeightedTally {
    entries: Vec<(String, i64)>,
}

impl WeightedTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, weight: i64) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, total)) => *total += weight,
            None => self.entries.push((key.to_string(), weight)),
        }
    }

    pub fn add_tags(&mut self, tags: &[MbTag]) {
        for tag in tags {
            self.add(&tag.name, tag.weight());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn winner(&self) -> Option<&str> {
        let mut best: Option<&(String, i64)> = None;
        for entry in &self.entries {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(key, _)| key.as_str())
    }
}

/// Cache-first resolver over a metadata lookup service
pub struct MetadataAggregator {
    lookup: Arc<dyn MetadataLookup>,
    cache: RecordingCache,
    pacing: Duration,
}

impl MetadataAggregator {
    pub fn new(lookup: Arc<dyn MetadataLookup>, cache: RecordingCache, pacing: Duration) -> Self {
        Self {
            lookup,
            cache,
            pacing,
        }
    }

    /// Resolve the fields of one recording
    ///
    /// Never fails: lookup errors yield all-null fields.
    pub async fn resolve(&self, recording_id: &str) -> Resolution {
        match self.cache.get(recording_id).await {
            Ok(Some(entry)) if entry.is_authoritative() => {
                debug!(mbid = %recording_id, "Recording cache hit");
                return Resolution {
                    fields: entry.fields,
                    diagnostics: Diagnostics::default(),
                    outcome: ResolveOutcome::CacheHit,
                };
            }
            Ok(_) => {}
            Err(e) => warn!("Recording cache read failed for {}: {}", recording_id, e),
        }

        let resolution = match self.lookup.lookup_recording(recording_id).await {
            Ok(payload) => self.resolve_fresh(recording_id, &payload).await,
            Err(e) => {
                warn!("MusicBrainz query failed for {}: {}", recording_id, e);
                Resolution {
                    fields: ResolvedFields::default(),
                    diagnostics: Diagnostics::default(),
                    outcome: ResolveOutcome::LookupFailed,
                }
            }
        };

        tokio::time::sleep(self.pacing).await;
        resolution
    }

    async fn resolve_fresh(&self, recording_id: &str, payload: &RecordingPayload) -> Resolution {
        let recording = &payload.recording;

        let fields = ResolvedFields {
            genre: self.resolve_genre(recording).await,
            year: earliest_year(recording),
            album_type: album_type(recording),
        };

        let entry = CacheEntry {
            track_mbid: recording_id.to_string(),
            fields: fields.clone(),
            recording_json: Some(payload.to_json()),
        };
        if let Err(e) = self.cache.put(&entry).await {
            warn!("Recording cache write failed for {}: {}", recording_id, e);
        }

        info!(
            "Resolved {}: genre={}, year={}, album_type={}",
            recording_id,
            fields.genre.as_deref().unwrap_or("None"),
            fields.year.map(|y| y.to_string()).unwrap_or_else(|| "None".to_string()),
            fields.album_type.as_deref().unwrap_or("None")
        );

        Resolution {
            diagnostics: Diagnostics::for_unresolved(&fields),
            fields,
            outcome: ResolveOutcome::Fresh,
        }
    }

    /// Recording and release-group tags, else tags of the credited artists
    async fn resolve_genre(&self, recording: &MbRecording) -> Option<String> {
        let mut tally = recording_tags(recording);

        if tally.is_empty() {
            for artist_id in recording.credited_artist_ids() {
                match self.lookup.lookup_artist_tags(artist_id).await {
                    Ok(tags) => tally.add_tags(&tags),
                    Err(e) => warn!("Artist tag lookup failed for {}: {}", artist_id, e),
                }
            }
        }

        tally.winner().map(String::from)
    }
}

fn recording_tags(recording: &MbRecording) -> WeightedTally {
    let mut tally = WeightedTally::new();
    tally.add_tags(&recording.tags);
    for release in &recording.releases {
        if let Some(group) = &release.release_group {
            tally.add_tags(&group.tags);
        }
    }
    tally
}

/// Minimum year across all releases
pub fn earliest_year(recording: &MbRecording) -> Option<i64> {
    recording
        .releases
        .iter()
        .filter_map(|release| release.effective_date())
        .filter_map(parse_year)
        .min()
}

/// Leading numeric token of a `YYYY[-MM[-DD]]` date
fn parse_year(date: &str) -> Option<i64> {
    date.split('-').next()?.trim().parse().ok()
}

/// Primary type vote, then status vote, then title keywords
pub fn album_type(recording: &MbRecording) -> Option<String> {
    let mut primary_types = WeightedTally::new();
    for release in &recording.releases {
        let primary = release
            .release_group
            .as_ref()
            .and_then(|group| group.primary_type.as_deref());
        if let Some(primary) = primary.filter(|p| !p.is_empty()) {
            primary_types.add(primary, 1);
        }
    }
    if let Some(winner) = primary_types.winner() {
        return Some(winner.to_string());
    }

    let mut statuses = WeightedTally::new();
    for release in &recording.releases {
        if let Some(status) = release.status.as_deref().filter(|s| !s.is_empty()) {
            statuses.add(status, 1);
        }
    }
    if let Some(winner) = statuses.winner() {
        return Some(winner.to_string());
    }

    recording
        .releases
        .iter()
        .find_map(|release| title_keyword_type(release.title.as_deref()?))
        .map(String::from)
}

/// Album type implied by a release title, keywords in priority order
fn title_keyword_type(title: &str) -> Option<&'static str> {
    let title = title.to_lowercase();
    if title.contains("compilation") || title.contains("hits") {
        Some("Compilation")
    } else if title.contains("deluxe") {
        Some("Deluxe")
    } else if title.contains("soundtrack") {
        Some("Soundtrack")
    } else if title.contains("live") {
        Some("Live")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recording(value: serde_json::Value) -> MbRecording {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_tally_first_seen_wins_ties() {
        let mut tally = WeightedTally::new();
        tally.add("rock", 2);
        tally.add("pop", 3);
        tally.add("rock", 1);
        assert_eq!(tally.winner(), Some("rock"));

        tally.add("jazz", 4);
        assert_eq!(tally.winner(), Some("jazz"));
        assert_eq!(WeightedTally::new().winner(), None);
    }

    #[test]
    fn test_genre_weights_include_release_groups() {
        let rec = recording(json!({
            "id": "r",
            "tags": [{"name": "rock", "count": 2}],
            "releases": [
                {"release-group": {"tags": [{"name": "progressive rock", "count": 2}]}},
                {"release-group": {"tags": [{"name": "progressive rock"}]}}
            ]
        }));
        assert_eq!(recording_tags(&rec).winner(), Some("progressive rock"));
    }

    #[test]
    fn test_earliest_year_uses_event_fallback() {
        let rec = recording(json!({
            "id": "r",
            "releases": [
                {"date": "1991-05-01"},
                {"release-events": [{"date": "1975-11-21"}]},
                {"date": "garbage"},
                {}
            ]
        }));
        assert_eq!(earliest_year(&rec), Some(1975));
        assert_eq!(earliest_year(&recording(json!({"id": "r"}))), None);
    }

    #[test]
    fn test_primary_type_beats_live_keyword() {
        let rec = recording(json!({
            "id": "r",
            "releases": [
                {"title": "Live at Wembley", "status": "Official",
                 "release-group": {"primary-type": "Album"}}
            ]
        }));
        assert_eq!(album_type(&rec).as_deref(), Some("Album"));
    }

    #[test]
    fn test_primary_type_majority_vote() {
        let rec = recording(json!({
            "id": "r",
            "releases": [
                {"release-group": {"primary-type": "Single"}},
                {"release-group": {"primary-type": "Album"}},
                {"release-group": {"primary-type": "Album"}}
            ]
        }));
        assert_eq!(album_type(&rec).as_deref(), Some("Album"));
    }

    #[test]
    fn test_status_then_keywords() {
        let by_status = recording(json!({
            "id": "r",
            "releases": [{"title": "Greatest Hits", "status": "Bootleg"}]
        }));
        assert_eq!(album_type(&by_status).as_deref(), Some("Bootleg"));

        let by_keyword = recording(json!({
            "id": "r",
            "releases": [
                {"title": "Plain Title"},
                {"title": "Live and Deluxe"}
            ]
        }));
        assert_eq!(album_type(&by_keyword).as_deref(), Some("Deluxe"));

        let hits = recording(json!({"id": "r", "releases": [{"title": "Greatest HITS"}]}));
        assert_eq!(album_type(&hits).as_deref(), Some("Compilation"));

        assert_eq!(album_type(&recording(json!({"id": "r"}))), None);
    }

    #[test]
    fn test_diagnostics_merge() {
        let mut total = Diagnostics::default();
        total.merge(&Diagnostics::for_unresolved(&ResolvedFields::default()));
        total.merge(&Diagnostics::for_unresolved(&ResolvedFields {
            genre: Some("rock".to_string()),
            year: None,
            album_type: Some("Album".to_string()),
        }));
        assert_eq!(
            total,
            Diagnostics {
                missing_genre: 1,
                missing_year: 2,
                missing_album_type: 1
            }
        );
    }
}
