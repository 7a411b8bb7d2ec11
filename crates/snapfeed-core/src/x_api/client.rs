//! Reqwest-based X API v2 HTTP client.
//!
//! Bearer-token authentication, typed error mapping, and rate limit header
//! parsing. A 429 maps to [`XApiError::RateLimited`]; callers abort the
//! current handle's fetch rather than retrying in-process.

use chrono::{DateTime, Utc};

use crate::error::XApiError;

use super::types::{
    RateLimitInfo, SingleTweetResponse, TweetsResponse, UserResponse, XApiErrorResponse,
};

/// Default X API v2 base URL.
const DEFAULT_BASE_URL: &str = "https://api.x.com/2";

/// Tweet fields requested on every query.
const TWEET_FIELDS: &str = "public_metrics,created_at,author_id,conversation_id,text";

/// Expansions requested on every query.
const EXPANSIONS: &str = "author_id";

/// User fields requested on every query.
const USER_FIELDS: &str = "username,name";

/// HTTP client for the X API v2.
pub struct XApiClient {
    client: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl XApiClient {
    /// Create a new client with the given app-only bearer token.
    pub fn new(bearer_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            bearer_token,
        }
    }

    /// Create a new client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(bearer_token: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            bearer_token,
        }
    }

    /// Look up a user by handle.
    pub async fn get_user_by_username(&self, username: &str) -> Result<UserResponse, XApiError> {
        let path = format!("/users/by/username/{username}");
        let response = self.get(&path, &[]).await?;
        response
            .json()
            .await
            .map_err(|e| XApiError::Network { source: e })
    }

    /// Fetch a user's timeline within a time window, excluding replies.
    ///
    /// `max_results` is clamped to the endpoint's accepted 5–100 range.
    pub async fn get_user_tweets(
        &self,
        user_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        max_results: u32,
    ) -> Result<TweetsResponse, XApiError> {
        let path = format!("/users/{user_id}/tweets");
        let max = max_results.clamp(5, 100).to_string();
        let start = start_time.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let end = end_time.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let query = [
            ("max_results", max.as_str()),
            ("start_time", start.as_str()),
            ("end_time", end.as_str()),
            ("exclude", "replies"),
            ("tweet.fields", TWEET_FIELDS),
            ("expansions", EXPANSIONS),
            ("user.fields", USER_FIELDS),
        ];
        let response = self.get(&path, &query).await?;
        response
            .json()
            .await
            .map_err(|e| XApiError::Network { source: e })
    }

    /// Fetch a single tweet with author expansion.
    pub async fn get_tweet(&self, tweet_id: &str) -> Result<SingleTweetResponse, XApiError> {
        let path = format!("/tweets/{tweet_id}");
        let query = [
            ("tweet.fields", TWEET_FIELDS),
            ("expansions", EXPANSIONS),
            ("user.fields", USER_FIELDS),
        ];
        let response = self.get(&path, &query).await?;
        response
            .json()
            .await
            .map_err(|e| XApiError::Network { source: e })
    }

    /// Search recent tweets (used for conversation-spanning thread lookups
    /// with a `conversation_id:<id> from:<handle>` query).
    pub async fn search_recent(
        &self,
        query_string: &str,
        max_results: u32,
    ) -> Result<TweetsResponse, XApiError> {
        let max = max_results.clamp(10, 100).to_string();
        let query = [
            ("query", query_string),
            ("max_results", max.as_str()),
            ("tweet.fields", TWEET_FIELDS),
            ("expansions", EXPANSIONS),
            ("user.fields", USER_FIELDS),
        ];
        let response = self.get("/tweets/search/recent", &query).await?;
        response
            .json()
            .await
            .map_err(|e| XApiError::Network { source: e })
    }

    /// Parse rate limit headers from an X API response.
    fn parse_rate_limit_headers(headers: &reqwest::header::HeaderMap) -> RateLimitInfo {
        let remaining = headers
            .get("x-rate-limit-remaining")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let reset_at = headers
            .get("x-rate-limit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        RateLimitInfo {
            remaining,
            reset_at,
        }
    }

    /// Map an HTTP error response to a typed `XApiError`.
    async fn map_error_response(response: reqwest::Response) -> XApiError {
        let status = response.status().as_u16();
        let rate_info = Self::parse_rate_limit_headers(response.headers());

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<XApiErrorResponse>(&body)
            .ok()
            .and_then(|e| e.detail)
            .unwrap_or(body);

        match status {
            429 => {
                let retry_after = rate_info.reset_at.and_then(|reset| {
                    let now = chrono::Utc::now().timestamp() as u64;
                    reset.checked_sub(now)
                });
                XApiError::RateLimited { retry_after }
            }
            401 => XApiError::AuthFailed,
            404 => XApiError::NotFound { what: message },
            _ => XApiError::ApiError { status, message },
        }
    }

    /// Send a GET request and handle common error patterns.
    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, XApiError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .query(query)
            .send()
            .await
            .map_err(|e| XApiError::Network { source: e })?;

        let rate_info = Self::parse_rate_limit_headers(response.headers());
        tracing::debug!(
            path,
            status = response.status().as_u16(),
            remaining = ?rate_info.remaining,
            reset_at = ?rate_info.reset_at,
            "X API response"
        );

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::map_error_response(response).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_user_by_username_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/by/username/karpathy"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"id": "33836629", "username": "karpathy", "name": "Andrej Karpathy"}
            })))
            .mount(&server)
            .await;

        let client = XApiClient::with_base_url("test-token".into(), server.uri());
        let user = client
            .get_user_by_username("karpathy")
            .await
            .expect("user lookup");
        assert_eq!(user.data.id, "33836629");
        assert_eq!(user.data.username, "karpathy");
    }

    #[tokio::test]
    async fn get_user_tweets_excludes_replies() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/42/tweets"))
            .and(query_param("exclude", "replies"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"id": "2", "text": "second", "author_id": "42",
                     "created_at": "2026-07-30T10:00:00.000Z", "conversation_id": "2"},
                    {"id": "1", "text": "first", "author_id": "42",
                     "created_at": "2026-07-29T10:00:00.000Z", "conversation_id": "1"}
                ],
                "meta": {"result_count": 2}
            })))
            .mount(&server)
            .await;

        let client = XApiClient::with_base_url("tok".into(), server.uri());
        let end = chrono::Utc::now();
        let start = end - chrono::Duration::days(7);
        let resp = client
            .get_user_tweets("42", start, end, 20)
            .await
            .expect("timeline");
        assert_eq!(resp.data.len(), 2);
        assert_eq!(resp.data[0].id, "2");
    }

    #[tokio::test]
    async fn error_429_maps_to_rate_limited() {
        let server = MockServer::start().await;

        let reset = chrono::Utc::now().timestamp() as u64 + 120;
        Mock::given(method("GET"))
            .and(path("/users/by/username/somebody"))
            .respond_with(
                ResponseTemplate::new(429)
                    .append_header("x-rate-limit-remaining", "0")
                    .append_header("x-rate-limit-reset", reset.to_string())
                    .set_body_json(serde_json::json!({
                        "detail": "Too Many Requests", "status": 429
                    })),
            )
            .mount(&server)
            .await;

        let client = XApiClient::with_base_url("tok".into(), server.uri());
        let err = client.get_user_by_username("somebody").await.unwrap_err();
        match err {
            XApiError::RateLimited { retry_after } => {
                let secs = retry_after.expect("retry_after from reset header");
                assert!(secs <= 120);
            }
            other => panic!("expected RateLimited, got: {other}"),
        }
    }

    #[tokio::test]
    async fn error_401_maps_to_auth_failed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/tweets/123"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "title": "Unauthorized", "detail": "Unauthorized", "status": 401
            })))
            .mount(&server)
            .await;

        let client = XApiClient::with_base_url("bad".into(), server.uri());
        let err = client.get_tweet("123").await.unwrap_err();
        assert!(matches!(err, XApiError::AuthFailed));
    }

    #[tokio::test]
    async fn error_404_maps_to_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/by/username/ghost"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "detail": "Could not find user with username: [ghost].", "status": 404
            })))
            .mount(&server)
            .await;

        let client = XApiClient::with_base_url("tok".into(), server.uri());
        let err = client.get_user_by_username("ghost").await.unwrap_err();
        match err {
            XApiError::NotFound { what } => assert!(what.contains("ghost")),
            other => panic!("expected NotFound, got: {other}"),
        }
    }
}
