//! Vector distance and title keys

use std::path::Path;

/// Distances below this are the same song
pub const NEAR_DUPLICATE_THRESHOLD: f64 = 0.001;

/// Distances closer than this are ties
pub const TIE_EPSILON: f64 = 1e-6;

/// `1 - cos(a, b)`; `None` for empty, zero-norm or mismatched vectors
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    Some(1.0 - dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Lower-case and keep only alphanumeric characters
pub fn normalize_key(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Title used for duplicate detection
///
/// The stored title tag when present, else the file stem with a leading
/// `"<artist> - "` removed.
pub fn display_title(title: Option<&str>, file_path: &str) -> String {
    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        return title.to_string();
    }

    let stem = Path::new(file_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match stem.rsplit_once(" - ") {
        Some((_, title)) => title.to_string(),
        None => stem,
    }
}

/// Normalized file name (extension included) of a stored path
pub fn file_name_key(file_path: &str) -> String {
    let name = Path::new(file_path)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.to_string());
    normalize_key(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identical_and_opposite() {
        assert!(close(cosine_distance(&[1.0, 2.0], &[2.0, 4.0]).unwrap(), 0.0));
        assert!(close(cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]).unwrap(), 2.0));
        assert!(close(cosine_distance(&[1.0, 0.0], &[0.0, 3.0]).unwrap(), 1.0));
    }

    #[test]
    fn test_distance_is_symmetric() {
        let vectors: [&[f32]; 4] = [
            &[0.3, -1.2, 4.5],
            &[1.0, 1.0, 1.0],
            &[-0.001, 7.0, 0.25],
            &[1e-3, 2e-3, -5.0],
        ];
        for a in vectors {
            for b in vectors {
                assert_eq!(cosine_distance(a, b), cosine_distance(b, a));
            }
        }
    }

    #[test]
    fn test_degenerate_vectors() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_distance(&[1.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_distance(&[], &[]), None);
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Bohemian Rhapsody (Remastered)"), "bohemianrhapsodyremastered");
        assert_eq!(normalize_key("AC/DC - T.N.T."), "acdctnt");
        assert_eq!(normalize_key("Björk"), "björk");
        assert_eq!(normalize_key(" - ... "), "");
    }

    #[test]
    fn test_display_title_from_file_name() {
        assert_eq!(
            display_title(None, "/music/Queen - Bohemian Rhapsody.mp3"),
            "Bohemian Rhapsody"
        );
        assert_eq!(display_title(None, "/music/Intro.MP3"), "Intro");
        assert_eq!(display_title(Some("  "), "/m/A - B - C.mp3"), "C");
        assert_eq!(display_title(Some("Tagged"), "/m/A - B.mp3"), "Tagged");
    }

    #[test]
    fn test_file_name_key_includes_extension() {
        assert_eq!(
            file_name_key("/music/01 - Bohemian Rhapsody (Remastered).mp3"),
            "01bohemianrhapsodyremasteredmp3"
        );
    }
}
