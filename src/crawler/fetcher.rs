//! Remote fetch client
//!
//! This module issues single requests through the ScrapingAnt proxy:
//! - Building the shared, pooled HTTP client
//! - Passing the target URL and proxy options as query parameters
//! - Classifying failures into network, throttling and upstream errors
//!
//! There is no retry logic here; every call is exactly one attempt.

use crate::config::FetchConfig;
use crate::ScrapeError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Per-request options understood by the proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Render the page in a headless browser before returning it
    pub render_js: bool,

    /// Exit country of the proxy
    pub proxy_country: String,

    /// Proxy pool (`residential` or `datacenter`)
    pub proxy_type: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for FetchOptions {
    fn from(config: &FetchConfig) -> Self {
        Self {
            timeout_seconds: config.timeout_seconds,
            render_js: config.render_js,
            proxy_country: config.proxy_country.clone(),
            proxy_type: config.proxy_type.clone(),
        }
    }
}

/// Fetches one page body
///
/// Implementations must be safe to share between enrichment workers.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Performs a single attempt
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The response body
    /// * `Err(ScrapeError::Network)` - Connection failure or timeout
    /// * `Err(ScrapeError::RateLimited)` - The proxy is throttling us
    /// * `Err(ScrapeError::Upstream)` - Any other non-success status
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String, ScrapeError>;
}

/// Builds the HTTP client shared by every request of a run
///
/// The client keeps a connection pool, so cloning it is cheap and all
/// workers reuse the same connections to the proxy.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .gzip(true)
        .brotli(true)
        .build()
}

/// ScrapingAnt "general" endpoint client
#[derive(Clone)]
pub struct ScrapingAntClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl ScrapingAntClient {
    /// Creates a client from the fetch configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use bienici_scraper::config::FetchConfig;
    /// use bienici_scraper::crawler::ScrapingAntClient;
    ///
    /// let config = FetchConfig {
    ///     api_key: "my-key".to_string(),
    ///     ..FetchConfig::default()
    /// };
    ///
    /// let client = ScrapingAntClient::new(&config).unwrap();
    /// ```
    pub fn new(config: &FetchConfig) -> Result<Self, ScrapeError> {
        let client = build_http_client()?;
        Ok(Self::with_client(
            client,
            config.api_url.clone(),
            config.api_key.clone(),
        ))
    }

    /// Creates a client around an existing HTTP client
    pub fn with_client(client: Client, api_url: String, api_key: String) -> Self {
        Self {
            client,
            api_url,
            api_key,
        }
    }
}

impl std::fmt::Debug for ScrapingAntClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapingAntClient")
            .field("api_url", &self.api_url)
            .field("api_key", &crate::config::mask_key(&self.api_key))
            .finish()
    }
}

#[async_trait]
impl PageFetcher for ScrapingAntClient {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String, ScrapeError> {
        let browser = if options.render_js { "true" } else { "false" };

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("url", url),
                ("x-api-key", self.api_key.as_str()),
                ("browser", browser),
                ("proxy_country", options.proxy_country.as_str()),
                ("proxy_type", options.proxy_type.as_str()),
            ])
            .timeout(Duration::from_secs(options.timeout_seconds))
            .send()
            .await
            .map_err(|e| network_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(url, status, response.headers()));
        }

        response.text().await.map_err(|e| network_error(url, &e))
    }
}

/// Maps a non-success proxy status to an error
///
/// | Status | Error |
/// |--------|-------|
/// | 429, 409 (concurrency limit) | `RateLimited` |
/// | anything else | `Upstream` |
pub fn classify_status(url: &str, status: StatusCode, headers: &HeaderMap) -> ScrapeError {
    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::CONFLICT => ScrapeError::RateLimited {
            url: url.to_string(),
            status: status.as_u16(),
            retry_after: parse_retry_after(headers),
        },
        _ => ScrapeError::Upstream {
            url: url.to_string(),
            status: status.as_u16(),
        },
    }
}

/// Reads a `Retry-After` header given in seconds
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn network_error(url: &str, error: &reqwest::Error) -> ScrapeError {
    let message = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        error.to_string()
    };

    ScrapeError::Network {
        url: url.to_string(),
        message,
    }
}
