//! Document download.
//!
//! [`Fetcher`] is the narrow interface the ingest pipeline needs from the
//! network: a URL in, raw bytes out. [`HttpFetcher`] implements it over
//! `reqwest` with rustls certificate validation. Requests are not retried.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::FetchError;

/// Browser-like user agent. Several municipal sites refuse requests from
/// unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux i686) AppleWebKit/537.17 \
                                      (KHTML, like Gecko) Chrome/24.0.1312.27 Safari/537.17";

/// Retrieves raw document bytes for a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Downloads the document at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on connection, TLS, or HTTP status failures.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Downloads documents over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Starts building a fetcher.
    #[must_use]
    pub fn builder() -> HttpFetcherBuilder {
        HttpFetcherBuilder::default()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        log::debug!("Downloaded {} bytes from {url}", bytes.len());

        Ok(bytes.to_vec())
    }
}

/// Builder for [`HttpFetcher`].
#[derive(Debug, Clone, Default)]
pub struct HttpFetcherBuilder {
    timeout: Option<Duration>,
    headers: BTreeMap<String, String>,
}

impl HttpFetcherBuilder {
    /// Sets a per-request timeout. Without one a stalled server blocks
    /// its document indefinitely.
    #[must_use]
    pub const fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds an HTTP header to every request.
    #[must_use]
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_owned(), value.to_owned());
        self
    }

    /// Builds the fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if a header is invalid, or
    /// [`FetchError::Http`] if the TLS backend cannot be initialised.
    pub fn build(self) -> Result<HttpFetcher, FetchError> {
        let mut header_map = reqwest::header::HeaderMap::new();
        for (key, value) in &self.headers {
            let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| FetchError::Client(format!("invalid header name '{key}': {e}")))?;
            let val = reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| FetchError::Client(format!("invalid header value '{value}': {e}")))?;
            header_map.insert(name, val);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .default_headers(header_map);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(HttpFetcher {
            client: builder.build()?,
        })
    }
}
