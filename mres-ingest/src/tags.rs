//! Identifier tags embedded in audio files
//!
//! The recording MBID lives in a UFID frame owned by
//! `http://musicbrainz.org`, with a `MusicBrainz Track Id` TXXX frame as
//! fallback. Artist and release-group ids come from TXXX frames.

use id3::frame::{Content, UniqueFileIdentifier};
use id3::{ErrorKind, Frame, Tag, TagLike, Version};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// UFID owner used by MusicBrainz Picard
pub const MUSICBRAINZ_UFID_OWNER: &str = "http://musicbrainz.org";

const TXXX_TRACK_ID: &str = "musicbrainz track id";
const TXXX_ARTIST_ID: &str = "musicbrainz artist id";
const TXXX_RELEASE_GROUP_ID: &str = "musicbrainz release group id";

/// Tag I/O errors
#[derive(Debug, Error)]
pub enum TagError {
    #[error("Failed to read tags from {0}: {1}")]
    Read(PathBuf, String),

    #[error("Failed to write tags to {0}: {1}")]
    Write(PathBuf, String),
}

/// Identifiers and display strings read from one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTags {
    pub recording_id: Option<String>,
    pub artist_id: Option<String>,
    pub release_group_id: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
}

/// Reads and writes identifier tags
pub trait TagReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<FileTags, TagError>;

    /// Replace any UFID frames with a single MusicBrainz recording id
    fn write_recording_id(&self, path: &Path, recording_id: &str) -> Result<(), TagError>;
}

/// ID3v2 tag reader
#[derive(Debug, Clone, Copy, Default)]
pub struct Id3TagReader;

impl TagReader for Id3TagReader {
    fn read(&self, path: &Path) -> Result<FileTags, TagError> {
        let tag = match Tag::read_from_path(path) {
            Ok(tag) => tag,
            Err(e) if matches!(e.kind, ErrorKind::NoTag) => {
                debug!("No ID3 tag in {}", path.display());
                return Ok(FileTags::default());
            }
            Err(e) => return Err(TagError::Read(path.to_path_buf(), e.to_string())),
        };

        Ok(tags_from_id3(&tag))
    }

    fn write_recording_id(&self, path: &Path, recording_id: &str) -> Result<(), TagError> {
        let mut tag = match Tag::read_from_path(path) {
            Ok(tag) => tag,
            Err(e) if matches!(e.kind, ErrorKind::NoTag) => Tag::new(),
            Err(e) => return Err(TagError::Read(path.to_path_buf(), e.to_string())),
        };

        set_recording_id(&mut tag, recording_id);

        tag.write_to_path(path, Version::Id3v24)
            .map_err(|e| TagError::Write(path.to_path_buf(), e.to_string()))?;

        debug!("Embedded MBID {} into {}", recording_id, path.display());
        Ok(())
    }
}

fn tags_from_id3(tag: &Tag) -> FileTags {
    let mut tags = FileTags {
        artist: non_empty(tag.artist()),
        title: non_empty(tag.title()),
        ..Default::default()
    };

    for frame in tag.frames() {
        if let Content::UniqueFileIdentifier(ufid) = frame.content() {
            if ufid.owner_identifier == MUSICBRAINZ_UFID_OWNER {
                let id = String::from_utf8_lossy(&ufid.identifier);
                tags.recording_id = non_empty(Some(id.trim_end_matches('\0')));
                if tags.recording_id.is_some() {
                    break;
                }
            }
        }
    }

    for extended in tag.extended_texts() {
        let value = non_empty(Some(extended.value.trim_end_matches('\0')));
        match extended.description.to_lowercase().as_str() {
            TXXX_TRACK_ID if tags.recording_id.is_none() => tags.recording_id = value,
            TXXX_ARTIST_ID => tags.artist_id = value,
            TXXX_RELEASE_GROUP_ID => tags.release_group_id = value,
            _ => {}
        }
    }

    tags
}

fn set_recording_id(tag: &mut Tag, recording_id: &str) {
    let _ = tag.remove("UFID");
    tag.add_frame(Frame::with_content(
        "UFID",
        Content::UniqueFileIdentifier(UniqueFileIdentifier {
            owner_identifier: MUSICBRAINZ_UFID_OWNER.to_string(),
            identifier: recording_id.as_bytes().to_vec(),
        }),
    ));
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use id3::frame::ExtendedText;
    use tempfile::TempDir;

    fn txxx(description: &str, value: &str) -> Frame {
        Frame::with_content(
            "TXXX",
            Content::ExtendedText(ExtendedText {
                description: description.to_string(),
                value: value.to_string(),
            }),
        )
    }

    #[test]
    fn test_ufid_wins_over_txxx_track_id() {
        let mut tag = Tag::new();
        tag.set_artist("Queen");
        tag.set_title("Bohemian Rhapsody");
        tag.add_frame(txxx("MusicBrainz Track Id", "from-txxx"));
        tag.add_frame(txxx("MusicBrainz Artist Id", "artist-1"));
        tag.add_frame(txxx("MUSICBRAINZ RELEASE GROUP ID", "rg-1"));
        set_recording_id(&mut tag, "from-ufid");

        let tags = tags_from_id3(&tag);
        assert_eq!(tags.recording_id.as_deref(), Some("from-ufid"));
        assert_eq!(tags.artist_id.as_deref(), Some("artist-1"));
        assert_eq!(tags.release_group_id.as_deref(), Some("rg-1"));
        assert_eq!(tags.artist.as_deref(), Some("Queen"));
        assert_eq!(tags.title.as_deref(), Some("Bohemian Rhapsody"));
    }

    #[test]
    fn test_txxx_track_id_fallback() {
        let mut tag = Tag::new();
        tag.add_frame(txxx("musicbrainz track id", "rec-42"));
        assert_eq!(tags_from_id3(&tag).recording_id.as_deref(), Some("rec-42"));
    }

    #[test]
    fn test_foreign_ufid_ignored() {
        let mut tag = Tag::new();
        tag.add_frame(Frame::with_content(
            "UFID",
            Content::UniqueFileIdentifier(UniqueFileIdentifier {
                owner_identifier: "http://example.com".to_string(),
                identifier: b"other".to_vec(),
            }),
        ));
        assert_eq!(tags_from_id3(&tag).recording_id, None);
    }

    #[test]
    fn test_untagged_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("raw.mp3");
        std::fs::write(&path, [0xFFu8, 0xFB, 0x90, 0x00]).unwrap();

        assert_eq!(Id3TagReader.read(&path).unwrap(), FileTags::default());
    }

    #[test]
    fn test_write_recording_id_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("song.mp3");
        std::fs::write(&path, [0xFFu8, 0xFB, 0x90, 0x00]).unwrap();

        Id3TagReader.write_recording_id(&path, "rec-1").unwrap();
        Id3TagReader.write_recording_id(&path, "rec-2").unwrap();

        let tag = Tag::read_from_path(&path).unwrap();
        let ufids: Vec<_> = tag
            .frames()
            .filter(|f| f.id() == "UFID")
            .collect();
        assert_eq!(ufids.len(), 1);
        assert_eq!(Id3TagReader.read(&path).unwrap().recording_id.as_deref(), Some("rec-2"));
    }
}
