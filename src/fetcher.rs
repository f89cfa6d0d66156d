//! Cache-first HTTP retrieval
//!
//! Every request goes through the [`CacheStore`] first. Only on a miss does
//! the fetcher wait the configured delay and hit the network; whatever comes
//! back is stored as-is, regardless of the response status.

use crate::cache::{CacheError, CacheStore};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while fetching a URL
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be completed (DNS, connection, timeout, ...)
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The response could not be written to the cache
    #[error("Failed to cache response for {url}: {source}")]
    Cache { url: String, source: CacheError },
}

/// Performs the actual network GET for a URL
///
/// Implementations return the response body as text. Non-success status
/// codes are not errors at this level.
pub trait Transport {
    /// Issues a GET request and returns the body
    fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// Blocking `reqwest` transport
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Creates a transport using a default blocking client
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<String, FetchError> {
        let transport_error = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().map_err(transport_error)?;
        response.text().map_err(transport_error)
    }
}

/// Cache-first fetcher with a fixed courtesy delay before network requests
pub struct HttpFetcher<T = HttpTransport> {
    transport: T,
    delay: Duration,
}

impl<T: Transport> HttpFetcher<T> {
    /// Creates a fetcher sleeping `delay` before every uncached request
    pub fn new(transport: T, delay: Duration) -> Self {
        Self { transport, delay }
    }

    /// Returns the body for `url`, consulting `cache` before the network
    ///
    /// # Errors
    ///
    /// Transport failures are returned as-is and nothing is cached for
    /// the URL. A failure to persist the cache is reported as
    /// [`FetchError::Cache`].
    pub fn fetch(&self, url: &str, cache: &mut CacheStore) -> Result<String, FetchError> {
        if let Some(body) = cache.get(url) {
            debug!(url, "using cache");
            return Ok(body.to_string());
        }

        info!(url, "fetching");
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let body = self.transport.get(url)?;

        cache
            .put(url, body.clone())
            .map_err(|e| FetchError::Cache {
                url: url.to_string(),
                source: e,
            })?;

        Ok(body)
    }

    /// Returns the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
