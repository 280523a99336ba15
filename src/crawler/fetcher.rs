//! HTTP fetcher shared by the archive pager and the article fetcher
//!
//! This module wraps a single `reqwest` client and maps every response into
//! either the body text or a [`FetchError`] carrying the status code, which is
//! what the retry classification works from.

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE},
    Client,
};

use crate::utils::error::FetchError;

/// Thin HTTP GET client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,
}

impl HttpFetcher {
    /// Create a new fetcher
    ///
    /// # Arguments
    ///
    /// * `user_agent` - User-Agent header sent with every request
    /// * `timeout` - Request timeout duration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(Self::default_headers())
            .timeout(timeout)
            .gzip(true)
            .build()?;

        Ok(Self { client })
    }

    /// GET `url` with optional query pairs and return the body text
    ///
    /// # Errors
    ///
    /// - `FetchError::Status` for any non-2xx response
    /// - `FetchError::Timeout` when the request times out
    /// - `FetchError::Http` for other transport failures
    pub async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        tracing::trace!(url, ?query, "GET");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| Self::transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| Self::transport_error(url, e))
    }

    fn transport_error(url: &str, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(url.to_string())
        } else {
            FetchError::Http(error)
        }
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers
    }
}
