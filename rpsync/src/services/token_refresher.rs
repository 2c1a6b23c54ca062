//! Spotify access token refresh
//!
//! Exchanges the long-lived refresh token for a short-lived access token at
//! the accounts service, using HTTP Basic client authentication.

use crate::error::{SyncError, SyncResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

pub(crate) const USER_AGENT: &str = concat!("rpsync/", env!("CARGO_PKG_VERSION"));
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Short-lived bearer token for the Web API
///
/// Never printed: `Debug` is redacted and there is no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Token endpoint response body
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// `base64(client_id:client_secret)` for the Basic authorization header
pub fn basic_credential(client_id: &str, client_secret: &str) -> String {
    STANDARD.encode(format!("{}:{}", client_id, client_secret))
}

/// Client for the token endpoint
pub struct TokenRefresher {
    http_client: reqwest::Client,
    token_url: String,
}

impl TokenRefresher {
    pub fn new(token_url: impl Into<String>) -> SyncResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            token_url: token_url.into(),
        })
    }

    /// Exchange the refresh token for an access token
    ///
    /// Any status other than 200 is an [`SyncError::AuthRefresh`]. No retry.
    pub async fn refresh(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> SyncResult<AccessToken> {
        debug!(url = %self.token_url, "Requesting access token");

        let response = self
            .http_client
            .post(&self.token_url)
            .header(
                AUTHORIZATION,
                format!("Basic {}", basic_credential(client_id, client_secret)),
            )
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::AuthRefresh {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Parse(format!("token response: {}", e)))?;

        info!(expires_in = ?token.expires_in, "Access token refreshed");

        Ok(AccessToken(token.access_token))
    }
}
