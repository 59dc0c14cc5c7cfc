//! Page fetching
//!
//! This module defines the `PageFetcher` seam the unit processor pulls page
//! content through, and the default HTTP implementation:
//! - Building the HTTP client with the configured user agent and timeout
//! - Building the listing URL for a unit and page
//! - Retrying transient failures
//! - Classifying errors

use crate::config::SourceConfig;
use crate::domain::WorkUnit;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A page could not be retrieved
///
/// Every variant ends the unit for this run; the unit resumes from the same
/// page next time.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Failed to read body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Returns true if another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Timeout { .. } | Self::Network { .. } | Self::Body { .. } => true,
            Self::InvalidUrl(_) => false,
        }
    }
}

/// Source of raw page content
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Returns the content of `page` (1-based) for `unit`
    async fn fetch(&self, unit: &WorkUnit, page: u32) -> Result<String, FetchError>;
}

/// Builds an HTTP client for the configured source
pub fn build_http_client(config: &SourceConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches listing pages over HTTP GET
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx | Return body |
/// | HTTP 4xx | Fail immediately |
/// | HTTP 5xx | Retry up to `max-retries` times |
/// | Timeout / connection error | Retry up to `max-retries` times |
pub struct HttpFetcher {
    client: Client,
    config: SourceConfig,
}

impl HttpFetcher {
    pub fn new(config: &SourceConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            config: config.clone(),
        })
    }

    /// Listing URL for one page of a unit
    ///
    /// Fixed parameters come first, then the unit's dimensions, then the page.
    pub fn page_url(&self, unit: &WorkUnit, page: u32) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", self.config.base_url, e)))?;

        {
            let mut query = url.query_pairs_mut();
            for (name, value) in &self.config.params {
                query.append_pair(name, value);
            }
            for (name, value) in &unit.dimensions {
                query.append_pair(name, value);
            }
            query.append_pair(&self.config.page_param, &page.to_string());
        }

        Ok(url)
    }

    async fn fetch_once(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, unit: &WorkUnit, page: u32) -> Result<String, FetchError> {
        let url = self.page_url(unit, page)?;
        let retry_delay = Duration::from_millis(self.config.retry_delay_ms);
        let mut attempt = 0;

        loop {
            match self.fetch_once(&url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        "Retrying {} page {} ({}/{}): {}",
                        unit.key,
                        page,
                        attempt,
                        self.config.max_retries,
                        e
                    );
                    tokio::time::sleep(retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
