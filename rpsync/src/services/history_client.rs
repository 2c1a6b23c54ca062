//! Recently-played history fetch
//!
//! One request per run: up to [`PAGE_LIMIT`] plays after the watermark. The
//! records come back as raw JSON; mapping them to rows is the loader's job.

use crate::error::{SyncError, SyncResult};
use crate::services::token_refresher::{AccessToken, REQUEST_TIMEOUT, USER_AGENT};
use reqwest::StatusCode;
use rpsync_common::config::FetchErrorPolicy;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Page size requested from the history endpoint (the API maximum)
pub const PAGE_LIMIT: usize = 50;

/// Body of a recently-played response; only `items` is used
#[derive(Debug, Deserialize)]
struct RecentlyPlayedPage {
    items: Vec<Value>,
}

/// Client for `GET /me/player/recently-played`
pub struct HistoryClient {
    http_client: reqwest::Client,
    endpoint: String,
    error_policy: FetchErrorPolicy,
}

impl HistoryClient {
    /// `api_base_url` is the Web API root, e.g. `https://api.spotify.com/v1`
    pub fn new(api_base_url: &str, error_policy: FetchErrorPolicy) -> SyncResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            endpoint: format!(
                "{}/me/player/recently-played",
                api_base_url.trim_end_matches('/')
            ),
            error_policy,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch plays that started after `after_millis`
    ///
    /// An empty list means there was nothing new. A non-200 answer is a
    /// [`SyncError::Fetch`] unless the client was built with
    /// [`FetchErrorPolicy::TreatAsEmpty`].
    pub async fn fetch_since(
        &self,
        access_token: &AccessToken,
        after_millis: i64,
    ) -> SyncResult<Vec<Value>> {
        debug!(after = after_millis, "Querying recently played tracks");

        let response = self
            .http_client
            .get(&self.endpoint)
            .bearer_auth(access_token.as_str())
            .query(&[
                ("limit", PAGE_LIMIT.to_string()),
                ("after", after_millis.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return match self.error_policy {
                FetchErrorPolicy::Fail => Err(SyncError::Fetch {
                    status: status.as_u16(),
                    body,
                }),
                FetchErrorPolicy::TreatAsEmpty => {
                    warn!(
                        status = status.as_u16(),
                        "History request failed; continuing with no records"
                    );
                    Ok(Vec::new())
                }
            };
        }

        let page: RecentlyPlayedPage = response
            .json()
            .await
            .map_err(|e| SyncError::Parse(format!("recently played response: {}", e)))?;

        if page.items.len() >= PAGE_LIMIT {
            // Only one page is read per run
            warn!(
                count = page.items.len(),
                "History page is full; plays beyond this page were not fetched"
            );
        }

        info!(count = page.items.len(), "Fetched recently played tracks");

        Ok(page.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = HistoryClient::new("https://api.example.test/v1/", FetchErrorPolicy::Fail).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://api.example.test/v1/me/player/recently-played"
        );
    }

    #[tokio::test]
    async fn test_fetch_sends_cursor_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player/recently-played"))
            .and(query_param("limit", "50"))
            .and(query_param("after", "1704067200000"))
            .and(header("authorization", "Bearer access-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"played_at": "2024-03-01T12:00:00.000Z"}],
                "next": null,
                "limit": 50
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HistoryClient::new(&format!("{}/v1", server.uri()), FetchErrorPolicy::Fail).unwrap();
        let items = client
            .fetch_since(&AccessToken::new("access-123"), 1_704_067_200_000)
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["played_at"], "2024-03-01T12:00:00.000Z");
    }

    #[tokio::test]
    async fn test_empty_page_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .mount(&server)
            .await;

        let client = HistoryClient::new(&format!("{}/v1", server.uri()), FetchErrorPolicy::Fail).unwrap();
        let items = client.fetch_since(&AccessToken::new("t"), 0).await.unwrap();

        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_non_200_fails_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .mount(&server)
            .await;

        let client = HistoryClient::new(&format!("{}/v1", server.uri()), FetchErrorPolicy::Fail).unwrap();
        let err = client.fetch_since(&AccessToken::new("t"), 0).await.unwrap_err();

        assert!(matches!(err, SyncError::Fetch { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_non_200_empty_under_lenient_policy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client =
            HistoryClient::new(&format!("{}/v1", server.uri()), FetchErrorPolicy::TreatAsEmpty).unwrap();
        let items = client.fetch_since(&AccessToken::new("t"), 0).await.unwrap();

        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_body_without_items_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "nope" })))
            .mount(&server)
            .await;

        let client = HistoryClient::new(&format!("{}/v1", server.uri()), FetchErrorPolicy::Fail).unwrap();
        let err = client.fetch_since(&AccessToken::new("t"), 0).await.unwrap_err();

        assert!(matches!(err, SyncError::Parse(_)));
    }
}
