//! Authenticated GitHub HTTP client.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::GitHubError;
use super::types::Paged;
use crate::domain::RateInfo;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const PER_PAGE: &str = "100";

const API_VERSION: &str = "2022-11-28";

/// Latest rate limit seen by one logical fetch.
///
/// Each caller owns its tracker, so concurrent category fetches sharing a
/// client never see each other's quota readings.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateTracker(Option<RateInfo>);

impl RateTracker {
    /// Keeps `info` when present; responses without rate headers leave the
    /// previous reading in place.
    pub fn observe(&mut self, info: Option<RateInfo>) {
        if info.is_some() {
            self.0 = info;
        }
    }

    pub fn latest(&self) -> Option<RateInfo> {
        self.0
    }
}

/// Thin wrapper over [`reqwest::Client`] that knows GitHub's auth headers,
/// `Link` pagination and `x-ratelimit-*` headers.
///
/// Clones share the connection pool.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: &str, base_url: &str) -> Result<Self, GitHubError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| GitHubError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("dashwatch/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Reads the token from `GITHUB_TOKEN`.
    pub fn from_env(base_url: &str) -> Result<Self, GitHubError> {
        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or(GitHubError::MissingToken)?;
        Self::new(&token, base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches a single (non-paginated) resource.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        rate: &mut RateTracker,
    ) -> Result<T, GitHubError> {
        let (value, _) = self.get_page(self.url(path, query)?, rate).await?;
        Ok(value)
    }

    /// Follows `rel="next"` links until exhausted. Any failing page fails
    /// the whole call; partial results are discarded.
    pub async fn get_all<P: Paged>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        cancel: &CancellationToken,
        rate: &mut RateTracker,
    ) -> Result<Vec<P::Item>, GitHubError> {
        let mut params = query.to_vec();
        params.push(("per_page", PER_PAGE));

        let mut next = Some(self.url(path, &params)?);
        let mut items = Vec::new();
        while let Some(url) = next.take() {
            if cancel.is_cancelled() {
                return Err(GitHubError::Cancelled);
            }
            let (page, following): (P, _) = self.get_page(url, rate).await?;
            items.extend(page.into_items());
            next = following;
        }
        Ok(items)
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, GitHubError> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse_with_params(&raw, query).map_err(|e| GitHubError::InvalidUrl(format!("{raw}: {e}")))
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: Url,
        rate: &mut RateTracker,
    ) -> Result<(T, Option<Url>), GitHubError> {
        debug!(%url, "GET");
        let response = self.http.get(url.clone()).send().await?;
        // Error responses carry the quota too.
        rate.observe(parse_rate_headers(response.headers()));

        let status = response.status();
        if !status.is_success() {
            return Err(GitHubError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let next = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_link)
            .and_then(|link| Url::parse(&link).ok());

        let body = response.json::<T>().await?;
        Ok((body, next))
    }
}

/// Extracts the `rel="next"` target from a GitHub `Link` header:
/// `<https://api.github.com/...&page=2>; rel="next", <...&page=5>; rel="last"`
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut url = None;
        let mut is_next = false;
        for segment in part.split(';') {
            let segment = segment.trim();
            if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                url = Some(inner);
            } else if let Some(rel) = segment.strip_prefix("rel=") {
                is_next = rel.trim_matches('"') == "next";
            }
        }
        url.filter(|_| is_next).map(String::from)
    })
}

/// Reads `x-ratelimit-limit`, `x-ratelimit-remaining` and `x-ratelimit-reset`.
/// All three must be present and numeric.
pub fn parse_rate_headers(headers: &HeaderMap) -> Option<RateInfo> {
    let number = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
    };
    let limit = u32::try_from(number("x-ratelimit-limit")?).ok()?;
    let remaining = u32::try_from(number("x-ratelimit-remaining")?).ok()?;
    let reset_at = DateTime::from_timestamp(number("x-ratelimit-reset")?, 0).unwrap_or_else(Utc::now);
    Some(RateInfo {
        limit,
        remaining,
        reset_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_link_is_found_among_others() {
        let header = r#"<https://api.github.com/repos/a/b/issues?page=1>; rel="prev", <https://api.github.com/repos/a/b/issues?per_page=100&page=3>; rel="next", <https://api.github.com/repos/a/b/issues?page=9>; rel="last""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://api.github.com/repos/a/b/issues?per_page=100&page=3")
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let header = r#"<https://api.github.com/x?page=1>; rel="first", <https://api.github.com/x?page=1>; rel="prev""#;
        assert_eq!(parse_next_link(header), None);
        assert_eq!(parse_next_link(""), None);
    }

    #[test]
    fn rate_headers_parse() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("5000"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("42"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1717243200"));

        let rate = parse_rate_headers(&headers).unwrap();
        assert_eq!(rate.limit, 5000);
        assert_eq!(rate.remaining, 42);
        assert_eq!(rate.reset_at.timestamp(), 1_717_243_200);
        assert!(rate.is_low());
    }

    #[test]
    fn incomplete_rate_headers_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("5000"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("lots"));
        assert!(parse_rate_headers(&headers).is_none());
    }

    #[test]
    fn tracker_keeps_last_reading() {
        let reading = |remaining| RateInfo {
            limit: 5000,
            remaining,
            reset_at: Utc::now(),
        };
        let mut rate = RateTracker::default();
        assert!(rate.latest().is_none());
        rate.observe(Some(reading(10)));
        rate.observe(None);
        assert_eq!(rate.latest().map(|r| r.remaining), Some(10));
        rate.observe(Some(reading(9)));
        assert_eq!(rate.latest().map(|r| r.remaining), Some(9));
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = GitHubClient::new("t", "https://ghe.example.com/api/v3/").unwrap();
        assert_eq!(client.base_url(), "https://ghe.example.com/api/v3");
        let url = client
            .url("/repos/acme/w/issues", &[("state", "open")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/acme/w/issues?state=open"
        );
    }

    #[test]
    fn token_with_newline_is_rejected() {
        assert!(matches!(
            GitHubClient::new("bad\ntoken", "https://api.github.com"),
            Err(GitHubError::InvalidToken)
        ));
    }
}
