//! Store record types

/// The three fields resolved from external metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFields {
    pub genre: Option<String>,
    pub year: Option<i64>,
    pub album_type: Option<String>,
}

impl ResolvedFields {
    /// All three fields are known
    pub fn is_complete(&self) -> bool {
        self.genre.is_some() && self.year.is_some() && self.album_type.is_some()
    }

    /// None of the fields are known
    pub fn is_empty(&self) -> bool {
        self.genre.is_none() && self.year.is_none() && self.album_type.is_none()
    }

    /// Values from `candidate` that would fill a gap in `self`
    ///
    /// Populated fields of `self` are never offered for replacement.
    pub fn gaps_filled_by(&self, candidate: &ResolvedFields) -> ResolvedFields {
        ResolvedFields {
            genre: self.genre.is_none().then(|| candidate.genre.clone()).flatten(),
            year: self.year.is_none().then_some(candidate.year).flatten(),
            album_type: self
                .album_type
                .is_none()
                .then(|| candidate.album_type.clone())
                .flatten(),
        }
    }

    /// Names of the populated fields, in column order
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.genre.is_some() {
            names.push("genre");
        }
        if self.year.is_some() {
            names.push("year");
        }
        if self.album_type.is_some() {
            names.push("album_type");
        }
        names
    }
}

/// One row of the `tracks` table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackRecord {
    /// Primary key
    pub file_path: String,
    /// MusicBrainz recording MBID
    pub track_mbid: Option<String>,
    pub artist_mbid: Option<String>,
    pub release_group_mbid: Option<String>,
    /// Display artist from tags
    pub artist: Option<String>,
    /// Display title from tags
    pub title: Option<String>,
    pub fields: ResolvedFields,
    pub embedding: Option<Vec<f32>>,
    /// Embedding function that produced `embedding`
    pub embedding_version: Option<String>,
}

impl TrackRecord {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    /// Whether the descriptor must be (re)built for the given embedding function
    ///
    /// Rows written before versioning (no stored version) are re-embedded too.
    pub fn needs_descriptor(&self, embedding_version: &str) -> bool {
        match (&self.embedding, &self.embedding_version) {
            (None, _) => true,
            (Some(_), Some(stored)) => stored != embedding_version,
            (Some(_), None) => true,
        }
    }
}

/// One row of the `mbid_cache` table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheEntry {
    pub track_mbid: String,
    pub fields: ResolvedFields,
    /// Raw lookup payload, retained verbatim
    pub recording_json: Option<String>,
}

impl CacheEntry {
    /// A stored raw payload means the fields are final, even when all null
    pub fn is_authoritative(&self) -> bool {
        self.recording_json
            .as_deref()
            .map(|json| !json.trim().is_empty())
            .unwrap_or(false)
    }
}
