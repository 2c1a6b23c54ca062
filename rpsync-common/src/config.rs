//! Configuration loading and root folder resolution
//!
//! The TOML file is optional. Every field has a default, so a run with no
//! config file at all still works as long as the Spotify secrets are present
//! in the environment.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Spotify accounts service token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Spotify Web API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Database file name used when the config does not name one
pub const DEFAULT_DATABASE_FILE: &str = "recently_played_songs.db";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "RPSYNC_ROOT_FOLDER";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding the database file
    pub root_folder: Option<PathBuf>,
    /// Database file name, relative to the root folder
    pub database_file: Option<String>,
    pub logging: LoggingConfig,
    pub spotify: SpotifyConfig,
    pub sync: SyncConfig,
}

/// `[logging]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "rpsync=info,rpsync_common=info".to_string(),
        }
    }
}

/// `[spotify]` table
///
/// The credential fields are the lowest-priority secret source; environment
/// variables win when both are set.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub token_url: String,
    pub api_base_url: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            refresh_token: None,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("SpotifyConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// `[sync]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub initial_watermark: InitialWatermark,
    pub fetch_error_policy: FetchErrorPolicy,
    /// Add a unique index on (played_at, song_name, artist) and skip duplicates
    pub deduplicate: bool,
}

/// Watermark used when the play event table is empty
///
/// ```toml
/// initial_watermark = "epoch"
/// # or
/// initial_watermark = { lookback_hours = 24 }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialWatermark {
    /// Start from the Unix epoch (cursor `after=0`)
    #[default]
    Epoch,
    /// Start from this many hours before the run
    LookbackHours(u32),
}

/// How the fetch stage treats a non-200 answer from the history endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorPolicy {
    /// Abort the run with a fetch error carrying the status code
    #[default]
    Fail,
    /// Log a warning and continue with no records
    TreatAsEmpty,
}

/// Load the TOML config
///
/// An explicitly given path must exist. Without one, the platform default
/// location is tried and built-in defaults are used if nothing is there.
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit_path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                debug!("No config file found, using defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Parse TOML text into a config
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// `~/.config/rpsync/config.toml` (platform equivalent elsewhere)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rpsync").join("config.toml"))
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    // ~/.local/share/rpsync on Linux, the platform data dir elsewhere
    dirs::data_local_dir()
        .map(|d| d.join("rpsync"))
        .unwrap_or_else(|| PathBuf::from("./rpsync_data"))
}

/// Full database path inside the root folder
pub fn database_path(root_folder: &Path, toml_config: &TomlConfig) -> PathBuf {
    let file = toml_config
        .database_file
        .as_deref()
        .unwrap_or(DEFAULT_DATABASE_FILE);
    root_folder.join(file)
}
