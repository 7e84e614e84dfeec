//! Music tree scanner
//!
//! Walks a directory tree and returns files with an enabled extension in
//! sorted path order. Symlinks are followed; a directory loop or a second
//! link to an already visited target is skipped. Unreadable entries are
//! logged and skipped.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Music file scanner
pub struct FileScanner {
    ignore_patterns: Vec<String>,
    /// Lower-case extensions without the dot
    extensions: Vec<String>,
}

impl FileScanner {
    /// Scanner for the given extensions, compared case-insensitively
    ///
    /// Skips system entries like .DS_Store, Thumbs.db, .git.
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
                "@eaDir".to_string(),
            ],
            extensions: extensions
                .iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Collect matching files below `root_path`
    pub fn scan(&self, root_path: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        let mut files = Vec::new();
        let mut symlink_visited = HashSet::new();

        let walker = WalkDir::new(root_path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e, &mut symlink_visited));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.has_enabled_extension(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                }
            }
        }

        files.sort();
        tracing::debug!("Scan of {} found {} files", root_path.display(), files.len());

        Ok(files)
    }

    fn should_process_entry(
        &self,
        entry: &DirEntry,
        symlink_visited: &mut HashSet<PathBuf>,
    ) -> bool {
        // The root is always walked, whatever its name
        if entry.depth() == 0 {
            return true;
        }

        let file_name = entry.file_name().to_string_lossy();
        if self
            .ignore_patterns
            .iter()
            .any(|pattern| file_name.contains(pattern.as_str()))
        {
            return false;
        }

        if entry.path_is_symlink() {
            if let Ok(canonical) = entry.path().canonicalize() {
                if !symlink_visited.insert(canonical) {
                    tracing::warn!("Symlink target already visited: {}", entry.path().display());
                    return false;
                }
            }
        }

        true
    }

    fn has_enabled_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new(&["mp3"])
    }
}
