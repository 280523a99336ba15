//! Full article metadata fetcher
//!
//! Several outcomes are final after a single attempt and produce the empty
//! sentinel instead of an error:
//! - the URL is on the skip list (no request at all)
//! - the URL is not an absolute http(s) URL (no request at all)
//! - the article page answers 404
//! - the page has no article data script, or the script is not valid JSON
//!
//! Everything else goes through the retry policy.

use url::Url;

use crate::crawler::fetcher::HttpFetcher;
use crate::crawler::rate_limit::RateLimiter;
use crate::crawler::skip::SkipList;
use crate::models::ArticleDetail;
use crate::parser::parse_article_html;
use crate::utils::error::FetchError;
use crate::utils::retry::{FailedFetch, RetryingFetcher};

/// Fetches the embedded metadata of one article page
#[derive(Debug)]
pub struct ArticleDetailFetcher {
    http: HttpFetcher,
    retry: RetryingFetcher,
    limiter: RateLimiter,
    skip: SkipList,
}

impl ArticleDetailFetcher {
    pub fn new(
        http: HttpFetcher,
        retry: RetryingFetcher,
        limiter: RateLimiter,
        skip: SkipList,
    ) -> Self {
        Self {
            http,
            retry,
            limiter,
            skip,
        }
    }

    /// Fetch full metadata for `url`
    ///
    /// # Errors
    ///
    /// Only raises when the detail retry policy is configured to raise on
    /// exhaustion; the default policy degrades every failure to the empty sentinel.
    pub async fn fetch(&self, url: &str) -> Result<ArticleDetail, FetchError> {
        if self.skip.is_url_skipped(url) {
            tracing::info!(url, "Skipping known-bad article URL");
            return Ok(ArticleDetail::Empty);
        }

        if !Self::is_fetchable(url) {
            tracing::info!(url, "Malformed article URL, recording empty result");
            return Ok(ArticleDetail::Empty);
        }

        let http = &self.http;

        let _permit = self.limiter.acquire().await;
        self.retry
            .run(url, move || async move {
                match http.get_text(url, &[]).await {
                    Ok(html) => Ok(Self::parse(url, &html)),
                    Err(FetchError::Status { status: 404, .. }) => {
                        tracing::info!(url, "Article not found (404)");
                        Ok(ArticleDetail::Empty)
                    }
                    Err(e) => Err(e),
                }
            })
            .await
    }

    /// Tolerated failures recorded so far
    pub fn failures(&self) -> Vec<FailedFetch> {
        self.retry.failures()
    }

    fn is_fetchable(url: &str) -> bool {
        Url::parse(url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false)
    }

    fn parse(url: &str, html: &str) -> ArticleDetail {
        match parse_article_html(html) {
            Ok(Some(payload)) => ArticleDetail::Found(payload),
            Ok(None) => {
                tracing::info!(url, "No article data in page");
                ArticleDetail::Empty
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "Unreadable article data");
                ArticleDetail::Empty
            }
        }
    }
}
