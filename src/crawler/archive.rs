//! Day archive pager with exhaustion detection
//!
//! This module requests the archive of one calendar day page by page
//! (`?page=1`, `?page=2`, ...) until the archive says there is nothing more.
//! Pagination metadata is re-read from every page because the size of a day's
//! archive is only known progressively.
//!
//! A page is terminal when:
//! - it has no `data` object or no content collection (no articles, or an
//!   unexpected payload shape), or
//! - its pagination links report the current page as the last one.

use futures::stream::{self, Stream};
use serde_json::Value;

use crate::crawler::fetcher::HttpFetcher;
use crate::crawler::rate_limit::RateLimiter;
use crate::crawler::skip::SkipList;
use crate::models::{ArchivePage, HarvestDay};
use crate::parser::parse_archive_html;
use crate::utils::error::{FetchError, ParseError};
use crate::utils::page_number;
use crate::utils::retry::{FailedFetch, RetryingFetcher};

/// Pages through the archive of a single day
#[derive(Debug)]
pub struct ArchivePager {
    http: HttpFetcher,
    retry: RetryingFetcher,
    limiter: RateLimiter,
    skip: SkipList,
    base_url: String,
}

impl ArchivePager {
    /// Create a new pager
    ///
    /// # Arguments
    ///
    /// * `http` - HTTP client
    /// * `retry` - Retry driver carrying the archive policy
    /// * `limiter` - Pacing shared by all archive requests
    /// * `skip` - Known-bad pages
    /// * `base_url` - Site root, e.g. `https://www.wsj.com`
    pub fn new(
        http: HttpFetcher,
        retry: RetryingFetcher,
        limiter: RateLimiter,
        skip: SkipList,
        base_url: &str,
    ) -> Self {
        Self {
            http,
            retry,
            limiter,
            skip,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Archive URL of a day, without the page parameter
    pub fn archive_url(&self, day: HarvestDay) -> String {
        format!("{}/news/archive/{}", self.base_url, day.archive_path())
    }

    /// Fetch one archive page
    ///
    /// Skipped pages return an empty page without any request.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::MaxRetriesExceeded` when a server error persists past
    /// the retry budget, or the transport error when the archive is unreachable.
    pub async fn fetch_page(&self, day: HarvestDay, page: u32) -> Result<ArchivePage, FetchError> {
        if self.skip.is_page_skipped(day.date(), page) {
            tracing::info!(day = %day, page, "Skipping known-bad archive page");
            return Ok(ArchivePage::empty());
        }

        let url = self.archive_url(day);
        let label = format!("{url}?page={page}");
        let query = [("page", page.to_string())];

        let http = &self.http;
        let (url, query) = (url.as_str(), &query);

        let _permit = self.limiter.acquire().await;
        self.retry
            .run(&label, move || async move {
                let html = http.get_text(url, query).await?;
                Ok::<_, FetchError>(Self::parse(&html, day, page))
            })
            .await
    }

    /// Lazily yield every page of a day, stopping after the terminal page
    ///
    /// The stream is finite and not restartable; a new call starts again at page 1.
    pub fn pages(
        &self,
        day: HarvestDay,
    ) -> impl Stream<Item = Result<ArchivePage, FetchError>> + '_ {
        stream::try_unfold(Some(1u32), move |next| async move {
            let Some(page_num) = next else {
                return Ok::<_, FetchError>(None);
            };

            let page = self.fetch_page(day, page_num).await?;
            let next = if is_exhausted(&page) {
                tracing::debug!(day = %day, pages = page_num, "Archive day exhausted");
                None
            } else {
                Some(page_num + 1)
            };

            Ok(Some((page, next)))
        })
    }

    /// Tolerated failures recorded so far
    pub fn failures(&self) -> Vec<FailedFetch> {
        self.retry.failures()
    }

    fn parse(html: &str, day: HarvestDay, page: u32) -> ArchivePage {
        match parse_archive_html(html) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(day = %day, page, error = %e, "Unreadable archive payload, treating as exhausted");
                ArchivePage::empty()
            }
        }
    }
}

/// Current and last page numbers from a page's pagination links
///
/// # Errors
///
/// Returns `ParseError::MissingCollection` when the page has no content
/// collection and `ParseError::MissingPagination` when the links are absent or
/// carry no page number.
pub fn pagination(page: &ArchivePage) -> Result<(u32, u32), ParseError> {
    let content = page.content().ok_or(ParseError::MissingCollection)?;
    let links = content
        .get("data")
        .and_then(|d| d.get("linksForPagination"))
        .ok_or(ParseError::MissingPagination)?;

    let number = |key: &str| {
        links
            .get(key)
            .and_then(Value::as_str)
            .and_then(page_number)
            .ok_or(ParseError::MissingPagination)
    };

    Ok((number("self")?, number("last")?))
}

/// Whether no page follows this one
pub fn is_exhausted(page: &ArchivePage) -> bool {
    match pagination(page) {
        Ok((current, last)) => current >= last,
        Err(ParseError::MissingCollection) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Archive page without usable pagination, treating as exhausted");
            true
        }
    }
}
