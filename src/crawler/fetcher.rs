//! Lightweight HTTP fetcher
//!
//! This module handles plain HTTP requests for detail pages and the package
//! index, including:
//! - Building the HTTP client with browser-like default headers
//! - Per-request user agents drawn from the configured pool
//! - Classifying a response as usable markup or a failed attempt

use async_trait::async_trait;
use rand::{rng, Rng};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA, USER_AGENT,
};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::{BrowserConfig, FetcherConfig};

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// User agent used when the configured pool is empty
const FALLBACK_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Failure of a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Empty response body")]
    EmptyBody,
}

/// Source of raw page markup
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`; only a 200 response with a non-empty body succeeds
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;

    /// Switches to another client identity before a retry
    fn rotate_identity(&self) {}
}

/// Builds the HTTP client shared by every lightweight fetch
///
/// # Arguments
///
/// * `browser` - Supplies the Accept-Language sent with every request
/// * `fetcher` - Supplies the per-request timeout
///
/// # Example
///
/// ```no_run
/// use card_harvest::config::Config;
/// use card_harvest::crawler::build_http_client;
///
/// let config = Config::default();
/// let client = build_http_client(&config.browser, &config.fetcher).unwrap();
/// ```
pub fn build_http_client(
    browser: &BrowserConfig,
    fetcher: &FetcherConfig,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    if let Ok(language) = HeaderValue::from_str(&browser.language) {
        headers.insert(ACCEPT_LANGUAGE, language);
    }

    Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(fetcher.request_timeout))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `reqwest`-backed fetcher rotating through a user-agent pool
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    user_agents: Vec<String>,
    current: AtomicUsize,
}

impl HttpFetcher {
    /// Creates a fetcher starting at a random user agent
    pub fn new(client: Client, user_agents: Vec<String>) -> Self {
        let start = if user_agents.len() > 1 {
            rng().random_range(0..user_agents.len())
        } else {
            0
        };
        Self {
            client,
            user_agents,
            current: AtomicUsize::new(start),
        }
    }

    pub fn from_config(
        browser: &BrowserConfig,
        fetcher: &FetcherConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(browser, fetcher)?;
        Ok(Self::new(client, browser.user_agents.clone()))
    }

    /// User agent sent with the next request
    pub fn user_agent(&self) -> &str {
        self.user_agents
            .get(self.current.load(Ordering::Relaxed))
            .map(String::as_str)
            .unwrap_or(FALLBACK_USER_AGENT)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agent())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!("GET {} returned {}", url, status);
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }

        Ok(body)
    }

    fn rotate_identity(&self) {
        let pool = self.user_agents.len();
        if pool < 2 {
            return;
        }
        let current = self.current.load(Ordering::Relaxed);
        let next = (current + rng().random_range(1..pool)) % pool;
        self.current.store(next, Ordering::Relaxed);
        debug!("Rotated user agent to #{}", next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(user_agents: &[&str]) -> HttpFetcher {
        let client = build_http_client(&BrowserConfig::default(), &FetcherConfig::default())
            .unwrap();
        HttpFetcher::new(client, user_agents.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&BrowserConfig::default(), &FetcherConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_rotation_changes_user_agent() {
        let fetcher = fetcher(&["ua-a", "ua-b", "ua-c"]);
        for _ in 0..10 {
            let before = fetcher.user_agent().to_string();
            fetcher.rotate_identity();
            assert_ne!(fetcher.user_agent(), before);
        }
    }

    #[test]
    fn test_empty_pool_uses_fallback() {
        let fetcher = fetcher(&[]);
        fetcher.rotate_identity();
        assert_eq!(fetcher.user_agent(), FALLBACK_USER_AGENT);
    }

    #[tokio::test]
    async fn test_fetch_sends_pool_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Cards/E53-021"))
            .and(header("user-agent", "ua-only"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let body = fetcher(&["ua-only"])
            .fetch(&format!("{}/Cards/E53-021", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_non_200_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = fetcher(&["ua"]).fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(503)));
    }

    #[tokio::test]
    async fn test_empty_body_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
            .mount(&server)
            .await;

        let err = fetcher(&["ua"]).fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, FetchError::EmptyBody));
    }
}
