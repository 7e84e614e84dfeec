//! Configuration loading and store path resolution
//!
//! Both tools read an optional TOML file for bootstrap settings. Values that
//! name a store location follow a fixed priority order:
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MRES_CONFIG";

/// Environment variable overriding the metadata store location
pub const STORE_PATH_ENV_VAR: &str = "MRES_DB_PATH";

/// Environment variable overriding the play-history store location
pub const PLAY_HISTORY_ENV_VAR: &str = "MRES_PLAY_HISTORY_DB";

/// Play-history database owned by the playback server
pub const DEFAULT_PLAY_HISTORY_PATH: &str = "/var/lib/mp3server/music_library.db";

const STORE_FILE_NAME: &str = "music-resolver.db";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Metadata store (track records + recording cache)
    pub store_path: Option<PathBuf>,

    /// Play-history database of the playback server
    pub play_history_path: Option<PathBuf>,

    pub logging: LoggingConfig,
    pub musicbrainz: MusicBrainzConfig,
    pub embedding: EmbeddingConfig,
    pub ingest: IngestConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// MusicBrainz web service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MusicBrainzConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Pause after every fresh (non-cached) recording lookup
    pub pacing_ms: u64,
    /// Minimum spacing between any two HTTP requests
    pub min_request_interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for MusicBrainzConfig {
    fn default() -> Self {
        Self {
            base_url: "https://musicbrainz.org/ws/2".to_string(),
            user_agent: concat!(
                "MusicResolver/",
                env!("CARGO_PKG_VERSION"),
                " (https://github.com/music-resolver/mres)"
            )
            .to_string(),
            pacing_ms: 1000,
            min_request_interval_ms: 1000,
            timeout_secs: 30,
        }
    }
}

/// Embedding service settings (Ollama-compatible `/api/embeddings`)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Directory walk settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    /// File extensions to enrich, compared case-insensitively
    pub extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".to_string()],
        }
    }
}

/// Load the TOML configuration
///
/// An explicit path (from `--config`) or `MRES_CONFIG` must point at a
/// readable file. Without either, the per-user config file is used when it
/// exists; otherwise built-in defaults apply.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        return read_toml_config(path);
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return read_toml_config(Path::new(&path));
    }

    match default_config_file() {
        Some(path) if path.exists() => read_toml_config(&path),
        _ => {
            debug!("No config file found, using defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Resolve the metadata store location (CLI → ENV → TOML → default)
pub fn resolve_store_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    resolve_path(
        cli_arg,
        STORE_PATH_ENV_VAR,
        config.store_path.as_deref(),
        default_store_path,
    )
}

/// Resolve the play-history store location (CLI → ENV → TOML → default)
pub fn resolve_play_history_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    resolve_path(
        cli_arg,
        PLAY_HISTORY_ENV_VAR,
        config.play_history_path.as_deref(),
        || PathBuf::from(DEFAULT_PLAY_HISTORY_PATH),
    )
}

fn resolve_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
    fallback: impl FnOnce() -> PathBuf,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    fallback()
}

/// Per-user config file (`~/.config/mres/config.toml` on Linux)
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mres").join("config.toml"))
}

/// OS-dependent default store location
fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mres"))
        .unwrap_or_else(|| PathBuf::from("./mres_data"))
        .join(STORE_FILE_NAME)
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(logging: &LoggingConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
