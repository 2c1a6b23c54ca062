//! Spotify credential resolution
//!
//! **Priority:** Environment → TOML `[spotify]` table
//!
//! The stores are consulted in the order given to [`resolve_credentials`];
//! the first non-blank value wins.

use crate::error::{SyncError, SyncResult};
use rpsync_common::config::SpotifyConfig;
use std::fmt;
use tracing::{info, warn};

/// The three secrets a sync run needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKey {
    ClientId,
    ClientSecret,
    RefreshToken,
}

impl SecretKey {
    pub const ALL: [SecretKey; 3] = [
        SecretKey::ClientId,
        SecretKey::ClientSecret,
        SecretKey::RefreshToken,
    ];

    /// Environment variable holding this secret
    pub fn env_var(self) -> &'static str {
        match self {
            SecretKey::ClientId => "SPOTIFY_CLIENT_ID",
            SecretKey::ClientSecret => "SPOTIFY_CLIENT_SECRET",
            SecretKey::RefreshToken => "SPOTIFY_REFRESH_TOKEN",
        }
    }

    /// Key inside the TOML `[spotify]` table
    pub fn toml_key(self) -> &'static str {
        match self {
            SecretKey::ClientId => "client_id",
            SecretKey::ClientSecret => "client_secret",
            SecretKey::RefreshToken => "refresh_token",
        }
    }
}

/// Source of opaque secret strings
pub trait SecretStore {
    /// Short name used in log messages
    fn name(&self) -> &str;

    fn get(&self, key: SecretKey) -> Option<String>;
}

/// Reads `SPOTIFY_*` environment variables (including ones loaded from `.env`)
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: SecretKey) -> Option<String> {
        std::env::var(key.env_var()).ok()
    }
}

/// Reads the `[spotify]` table of the TOML config
pub struct TomlSecretStore<'a> {
    config: &'a SpotifyConfig,
}

impl<'a> TomlSecretStore<'a> {
    pub fn new(config: &'a SpotifyConfig) -> Self {
        Self { config }
    }
}

impl SecretStore for TomlSecretStore<'_> {
    fn name(&self) -> &str {
        "TOML"
    }

    fn get(&self, key: SecretKey) -> Option<String> {
        match key {
            SecretKey::ClientId => self.config.client_id.clone(),
            SecretKey::ClientSecret => self.config.client_secret.clone(),
            SecretKey::RefreshToken => self.config.refresh_token.clone(),
        }
    }
}

/// Resolved Spotify application credentials and refresh token
#[derive(Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Validate secret (non-empty, non-whitespace)
pub fn is_valid_secret(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Resolve all three secrets from the given stores
///
/// Fails with [`SyncError::Secret`] listing every secret that no store
/// provided.
pub fn resolve_credentials(stores: &[&dyn SecretStore]) -> SyncResult<SpotifyCredentials> {
    let mut resolved = Vec::with_capacity(SecretKey::ALL.len());
    let mut missing = Vec::new();

    for key in SecretKey::ALL {
        let found: Vec<(&str, String)> = stores
            .iter()
            .filter_map(|store| {
                store
                    .get(key)
                    .filter(|v| is_valid_secret(v))
                    .map(|v| (store.name(), v))
            })
            .collect();

        if found.len() > 1 {
            let sources: Vec<&str> = found.iter().map(|(name, _)| *name).collect();
            warn!(
                "{} found in multiple sources: {}. Using {}.",
                key.env_var(),
                sources.join(", "),
                sources[0]
            );
        }

        match found.into_iter().next() {
            Some((source, value)) => {
                info!("{} loaded from {}", key.env_var(), source);
                resolved.push(value);
            }
            None => missing.push(key),
        }
    }

    if !missing.is_empty() {
        let names: Vec<String> = missing
            .iter()
            .map(|k| format!("{} (or [spotify] {})", k.env_var(), k.toml_key()))
            .collect();
        return Err(SyncError::Secret(format!(
            "Spotify secrets not configured: {}",
            names.join(", ")
        )));
    }

    let mut values = resolved.into_iter();
    match (values.next(), values.next(), values.next()) {
        (Some(client_id), Some(client_secret), Some(refresh_token)) => Ok(SpotifyCredentials {
            client_id,
            client_secret,
            refresh_token,
        }),
        _ => Err(SyncError::Secret("incomplete Spotify credentials".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapStore {
        name: &'static str,
        values: HashMap<&'static str, &'static str>,
    }

    impl SecretStore for MapStore {
        fn name(&self) -> &str {
            self.name
        }

        fn get(&self, key: SecretKey) -> Option<String> {
            self.values.get(key.env_var()).map(|v| v.to_string())
        }
    }

    fn store(name: &'static str, pairs: &[(&'static str, &'static str)]) -> MapStore {
        MapStore {
            name,
            values: pairs.iter().cloned().collect(),
        }
    }

    #[test]
    fn test_first_store_wins() {
        let primary = store(
            "primary",
            &[
                ("SPOTIFY_CLIENT_ID", "id-1"),
                ("SPOTIFY_CLIENT_SECRET", "secret-1"),
                ("SPOTIFY_REFRESH_TOKEN", "refresh-1"),
            ],
        );
        let fallback = store("fallback", &[("SPOTIFY_CLIENT_ID", "id-2")]);

        let creds = resolve_credentials(&[&primary, &fallback]).unwrap();
        assert_eq!(creds.client_id, "id-1");
        assert_eq!(creds.client_secret, "secret-1");
        assert_eq!(creds.refresh_token, "refresh-1");
    }

    #[test]
    fn test_blank_value_falls_through() {
        let primary = store(
            "primary",
            &[
                ("SPOTIFY_CLIENT_ID", "   "),
                ("SPOTIFY_CLIENT_SECRET", "secret-1"),
                ("SPOTIFY_REFRESH_TOKEN", "refresh-1"),
            ],
        );
        let fallback = store("fallback", &[("SPOTIFY_CLIENT_ID", "id-2")]);

        let creds = resolve_credentials(&[&primary, &fallback]).unwrap();
        assert_eq!(creds.client_id, "id-2");
    }

    #[test]
    fn test_missing_secrets_are_all_named() {
        let only_id = store("only", &[("SPOTIFY_CLIENT_ID", "id")]);

        let err = resolve_credentials(&[&only_id]).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, SyncError::Secret(_)));
        assert!(message.contains("SPOTIFY_CLIENT_SECRET"));
        assert!(message.contains("SPOTIFY_REFRESH_TOKEN"));
        assert!(!message.contains("SPOTIFY_CLIENT_ID"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = SpotifyCredentials {
            client_id: "id".to_string(),
            client_secret: "hunter2".to_string(),
            refresh_token: "refresh-xyz".to_string(),
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("refresh-xyz"));
    }

    #[test]
    fn test_toml_store_reads_spotify_table() {
        let config = SpotifyConfig {
            refresh_token: Some("from-toml".to_string()),
            ..Default::default()
        };
        let toml_store = TomlSecretStore::new(&config);
        assert_eq!(toml_store.get(SecretKey::RefreshToken).as_deref(), Some("from-toml"));
        assert_eq!(toml_store.get(SecretKey::ClientId), None);
    }
}
