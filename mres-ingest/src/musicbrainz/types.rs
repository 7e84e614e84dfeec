//! MusicBrainz WS/2 JSON shapes
//!
//! Only the parts read by the aggregator are typed; everything else stays in
//! the raw payload kept by the recording cache. Every field is optional since
//! the service omits empty lists and unknown values.

use serde::{Deserialize, Serialize};

/// Folksonomy tag with its vote count
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MbTag {
    pub name: String,
    /// Vote count; weight 1 when absent
    #[serde(default)]
    pub count: Option<i64>,
}

impl MbTag {
    pub fn weight(&self) -> i64 {
        self.count.unwrap_or(1)
    }
}

/// Recording returned by `/recording/{mbid}`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MbRecording {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<MbTag>,
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<MbArtistCredit>,
    #[serde(default)]
    pub releases: Vec<MbRelease>,
}

impl MbRecording {
    /// Credited artist ids, first appearance only
    pub fn credited_artist_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for credit in &self.artist_credit {
            if let Some(artist) = &credit.artist {
                if !ids.contains(&artist.id.as_str()) {
                    ids.push(&artist.id);
                }
            }
        }
        ids
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MbArtistCredit {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artist: Option<MbArtist>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MbArtist {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<MbTag>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MbRelease {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
    #[serde(default)]
    pub date: Option<String>,
    /// Official, Promotion, Bootleg, ...
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "release-events", default)]
    pub release_events: Vec<MbReleaseEvent>,
    #[serde(rename = "release-group", default)]
    pub release_group: Option<MbReleaseGroup>,
}

impl MbRelease {
    /// Release date, else the first release event's date
    pub fn effective_date(&self) -> Option<&str> {
        non_blank(self.date.as_deref()).or_else(|| {
            self.release_events
                .first()
                .and_then(|event| non_blank(event.date.as_deref()))
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MbReleaseEvent {
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MbReleaseGroup {
    #[serde(default)]
    pub id: Option<String>,
    /// Album, Single, EP, Broadcast, Other
    #[serde(rename = "primary-type", default)]
    pub primary_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<MbTag>,
}

/// Response of `/recording?query=...`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MbRecordingSearch {
    #[serde(default)]
    pub recordings: Vec<MbSearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MbSearchHit {
    pub id: String,
    #[serde(default)]
    pub score: Option<i64>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recording_parses_hyphenated_fields() {
        let recording: MbRecording = serde_json::from_value(json!({
            "id": "rec-1",
            "title": "Bohemian Rhapsody",
            "tags": [{"name": "rock", "count": 4}, {"name": "classic rock"}],
            "artist-credit": [
                {"name": "Queen", "artist": {"id": "artist-1", "name": "Queen"}},
                {"name": " & ", "artist": {"id": "artist-1", "name": "Queen"}}
            ],
            "releases": [{
                "title": "A Night at the Opera",
                "status": "Official",
                "release-events": [{"date": "1975-11-21"}],
                "release-group": {"id": "rg-1", "primary-type": "Album"}
            }]
        }))
        .unwrap();

        assert_eq!(recording.tags[1].weight(), 1);
        assert_eq!(recording.credited_artist_ids(), vec!["artist-1"]);

        let release = &recording.releases[0];
        assert_eq!(release.effective_date(), Some("1975-11-21"));
        assert_eq!(
            release.release_group.as_ref().and_then(|g| g.primary_type.as_deref()),
            Some("Album")
        );
    }

    #[test]
    fn test_missing_lists_default_empty() {
        let recording: MbRecording = serde_json::from_value(json!({"id": "rec-2"})).unwrap();
        assert!(recording.tags.is_empty());
        assert!(recording.releases.is_empty());
        assert!(recording.credited_artist_ids().is_empty());
    }

    #[test]
    fn test_empty_date_falls_back_to_release_event() {
        let release: MbRelease = serde_json::from_value(json!({
            "date": "",
            "release-events": [{"date": "1984"}, {"date": "1980"}]
        }))
        .unwrap();
        assert_eq!(release.effective_date(), Some("1984"));
    }
}
