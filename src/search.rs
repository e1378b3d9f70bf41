//! Custom Search API client with exponential backoff retry logic.
//!
//! # Architecture
//!
//! The module uses a trait-based design so the orchestrator never depends on
//! the network directly:
//! - [`SearchBackend`]: Core trait, one query in, raw items out
//! - [`GoogleSearchClient`]: `reqwest` implementation against the JSON API
//! - [`RetrySearch`]: Decorator that adds retry logic to any `SearchBackend`
//!
//! # Error Semantics
//!
//! | Outcome | Result |
//! |---------|--------|
//! | HTTP 200 | `Ok(items)`, empty when `items` is absent |
//! | Any other status | `Err(SearchError::Status)`, recoverable per city |
//! | Connection / timeout | `Err(SearchError::Transport)`, fatal |
//! | Body is not JSON | `Err(SearchError::Decode)`, fatal |
//!
//! # Retry Strategy
//!
//! Transport errors, 429 and 5xx statuses are retried up to `max_retries`
//! times. The delay doubles from `base_delay`, is capped at 30 seconds and
//! gets 0-250ms of random jitter.

use crate::config::SearchConfig;
use crate::models::{SearchItem, SearchResponse};
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Errors returned by a [`SearchBackend`].
#[derive(Debug, Error)]
pub enum SearchError {
    /// The API answered with something other than 200.
    #[error("search API returned HTTP {status}")]
    Status {
        /// The HTTP status code.
        status: u16,
    },

    /// The request never produced a response (DNS, TLS, connect, timeout).
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body could not be parsed.
    #[error("failed to decode search response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SearchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status } => *status == 429 || (500..600).contains(status),
            Self::Transport(_) => true,
            Self::Decode(_) => false,
        }
    }

    /// Whether the run can continue with zero results for this query.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}

/// Trait for anything that can run one search query.
pub trait SearchBackend {
    /// Run `query` and return the raw result items in ranking order.
    async fn search(&self, query: &str) -> Result<Vec<SearchItem>, SearchError>;
}

/// Client for the Google Custom Search JSON API.
pub struct GoogleSearchClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    engine_id: String,
}

impl fmt::Debug for GoogleSearchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleSearchClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl GoogleSearchClient {
    /// Create a client with the configured endpoint, credentials and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            engine_id: config.engine_id.clone(),
        })
    }

    /// Full request URL with `q`, `key` and `cx` encoded as query parameters.
    fn request_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("key", &self.api_key)
            .append_pair("cx", &self.engine_id);
        url
    }
}

impl SearchBackend for GoogleSearchClient {
    #[instrument(level = "info", skip_all, fields(endpoint = %self.endpoint))]
    async fn search(&self, query: &str) -> Result<Vec<SearchItem>, SearchError> {
        let t0 = Instant::now();
        let response = self.client.get(self.request_url(query)).send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            error!(
                status = status.as_u16(),
                elapsed_ms = t0.elapsed().as_millis(),
                "Search API returned an error status"
            );
            return Err(SearchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body_preview = %truncate_for_log(&body, 300),
                "Search API returned non-conforming JSON"
            );
            SearchError::Decode(e)
        })?;

        debug!(
            items = parsed.items.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "Search request completed"
        );
        Ok(parsed.items)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`SearchBackend`].
///
/// # Backoff Strategy
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetrySearch<T> {
    /// The underlying backend to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: Duration,
    /// Maximum delay cap.
    max_delay: Duration,
}

impl<T> RetrySearch<T>
where
    T: SearchBackend,
{
    /// Wrap `inner`, retrying up to `max_retries` times.
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetrySearch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySearch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> SearchBackend for RetrySearch<T>
where
    T: SearchBackend,
{
    async fn search(&self, query: &str) -> Result<Vec<SearchItem>, SearchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.search(query).await {
                Ok(items) => return Ok(items),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis(),
                            error = %e,
                            "search() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "search() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Build the production backend: a [`GoogleSearchClient`] wrapped in [`RetrySearch`].
pub fn build_backend(config: &SearchConfig) -> Result<RetrySearch<GoogleSearchClient>, SearchError> {
    let client = GoogleSearchClient::new(config)?;
    info!(
        endpoint = %config.endpoint,
        timeout = ?config.timeout,
        max_retries = config.max_retries,
        "Search client ready"
    );
    Ok(RetrySearch::new(client, config.max_retries, config.base_delay))
}
