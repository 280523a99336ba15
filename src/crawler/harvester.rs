//! Resumable harvest orchestration
//!
//! The harvester runs two independent sweeps over the journals:
//!
//! ```text
//!  shallow sweep:  day (newest → oldest) ─▶ ArchivePager ─▶ ArticleExtractor ─▶ shallow journal
//!  detail sweep:   shallow URLs − detail keys ─▶ ArticleDetailFetcher ─▶ detail journal
//! ```
//!
//! Both start from the maps rebuilt by [`Harvester::load`] and skip whatever is
//! already there, so an interrupted run picks up where it stopped. A day is
//! appended only after all of its pages were extracted; a URL is appended as
//! soon as its fetch returns. Memory is updated after the journal write.

use std::pin::pin;
use std::time::Duration;

use chrono::NaiveDate;
use futures::TryStreamExt;
use indexmap::{IndexMap, IndexSet};

use crate::config::Config;
use crate::crawler::archive::ArchivePager;
use crate::crawler::detail::ArticleDetailFetcher;
use crate::crawler::fetcher::HttpFetcher;
use crate::crawler::rate_limit::RateLimiter;
use crate::models::{ArticleDetail, ArticleSummary, HarvestDay, HarvestStats, JournalSummary};
use crate::parser::ArticleExtractor;
use crate::storage::{open_stores, DetailStore, ShallowStore};
use crate::utils::error::{FetchError, HarvestError, StoreError};
use crate::utils::retry::{FailedFetch, RetryingFetcher};

/// Progress is logged every this many detail fetches
const DETAIL_PROGRESS_EVERY: u64 = 100;

/// Drives the shallow and detail sweeps
#[derive(Debug)]
pub struct Harvester {
    pager: ArchivePager,
    details: ArticleDetailFetcher,
    extractor: ArticleExtractor,

    shallow_store: ShallowStore,
    detail_store: DetailStore,

    /// Day key → summaries, mirrors the shallow journal
    shallow: IndexMap<String, Vec<ArticleSummary>>,

    /// URL → detail, mirrors the detail journal
    full: IndexMap<String, ArticleDetail>,

    stats: HarvestStats,
}

impl Harvester {
    pub fn new(
        pager: ArchivePager,
        details: ArticleDetailFetcher,
        shallow_store: ShallowStore,
        detail_store: DetailStore,
    ) -> Self {
        Self {
            pager,
            details,
            extractor: ArticleExtractor::new(),
            shallow_store,
            detail_store,
            shallow: IndexMap::new(),
            full: IndexMap::new(),
            stats: HarvestStats::default(),
        }
    }

    /// Wire every component from configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let http = HttpFetcher::new(&config.http.user_agent, config.request_timeout())?;
        let skip = config.skip_list();

        let pager = ArchivePager::new(
            http.clone(),
            RetryingFetcher::new(config.archive.retry.to_policy()),
            RateLimiter::new(Duration::from_millis(config.archive.min_interval_ms)),
            skip.clone(),
            &config.archive.base_url,
        );

        let details = ArticleDetailFetcher::new(
            http,
            RetryingFetcher::new(config.detail.retry.to_policy()),
            RateLimiter::new(Duration::from_millis(config.detail.min_interval_ms)),
            skip,
        );

        let (shallow_store, detail_store) = open_stores(&config.storage);
        Ok(Self::new(pager, details, shallow_store, detail_store))
    }

    /// Wire from configuration and load both journals
    ///
    /// # Errors
    ///
    /// Returns `Error::Fetch` if the HTTP client cannot be created and
    /// `Error::Store` if a journal cannot be read
    pub fn open(config: &Config) -> crate::error::Result<Self> {
        let mut harvester = Self::from_config(config)?;
        harvester.load()?;
        Ok(harvester)
    }

    /// Rebuild both in-memory maps from the journals
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when a journal cannot be read or is corrupt
    pub fn load(&mut self) -> Result<(), StoreError> {
        self.shallow = self.shallow_store.load()?;
        self.full = self.detail_store.load()?;

        tracing::info!(
            days = self.shallow.len(),
            details = self.full.len(),
            "Loaded harvest state"
        );
        Ok(())
    }

    /// Run the pager and extractor for one day without persisting anything
    ///
    /// # Errors
    ///
    /// Propagates a fatal archive fetch error
    pub async fn harvest_day(&self, day: HarvestDay) -> Result<Vec<ArticleSummary>, FetchError> {
        let mut pages = pin!(self.pager.pages(day));
        let mut summaries = Vec::new();

        while let Some(page) = pages.try_next().await? {
            summaries.extend(self.extractor.extract(&page));
        }

        Ok(summaries)
    }

    /// Fetch every day from `end` back to `start` that the journal does not have yet
    ///
    /// # Errors
    ///
    /// Stops at the first day whose archive cannot be fetched, or the first
    /// journal write that fails. Days completed before that stay recorded.
    pub async fn shallow_sweep(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(), HarvestError> {
        if start > end {
            return Err(HarvestError::InvalidDateRange { start, end });
        }

        let total = (end - start).num_days() + 1;
        tracing::info!(%start, %end, days = total, "Starting shallow sweep");

        for day in HarvestDay::newest_first(start, end) {
            let key = day.key();
            if self.shallow.contains_key(&key) {
                self.stats.days_present += 1;
                continue;
            }

            let summaries = self
                .harvest_day(day)
                .await
                .map_err(|source| HarvestError::Day {
                    day: key.clone(),
                    source,
                })?;

            self.shallow_store.append(&key, &summaries)?;

            tracing::info!(day = %key, articles = summaries.len(), "Pulled archive day");
            self.stats.days_fetched += 1;
            self.stats.articles_extracted += summaries.len() as u64;
            self.shallow.insert(key, summaries);
        }

        self.stats.tolerated_failures = self.failures().len() as u64;
        Ok(())
    }

    /// Distinct article URLs from the shallow map that have no detail record yet
    ///
    /// Order follows first appearance in the shallow journal.
    pub fn pending_urls(&self) -> Vec<String> {
        self.shallow_urls()
            .into_iter()
            .filter(|url| !self.full.contains_key(*url))
            .map(str::to_string)
            .collect()
    }

    /// Fetch and record details for every pending URL
    ///
    /// # Arguments
    ///
    /// * `max_urls` - Stop after this many fetches (all pending when `None`)
    ///
    /// # Errors
    ///
    /// Returns `HarvestError::Store` if a record cannot be appended, or
    /// `HarvestError::Fetch` if the detail policy is configured to raise.
    pub async fn detail_sweep(&mut self, max_urls: Option<usize>) -> Result<(), HarvestError> {
        let known = self.shallow_urls().len();
        let pending = self.pending_urls();
        self.stats.urls_present += (known - pending.len()) as u64;

        let limit = max_urls.unwrap_or(pending.len()).min(pending.len());
        tracing::info!(
            pending = pending.len(),
            limit,
            present = known - pending.len(),
            "Starting detail sweep"
        );

        let mut fetched = 0u64;
        for url in pending.into_iter().take(limit) {
            let detail = self.details.fetch(&url).await?;
            self.detail_store.append(&url, &detail)?;

            fetched += 1;
            self.stats.urls_fetched += 1;
            if detail.is_empty() {
                self.stats.empty_details += 1;
            }
            self.full.insert(url, detail);

            if fetched % DETAIL_PROGRESS_EVERY == 0 {
                tracing::info!(
                    fetched,
                    remaining = limit as u64 - fetched,
                    "Detail sweep progress"
                );
            }
        }

        self.stats.tolerated_failures = self.failures().len() as u64;
        Ok(())
    }

    /// Tolerated failures from both sweeps, archive first
    pub fn failures(&self) -> Vec<FailedFetch> {
        let mut failures = self.pager.failures();
        failures.extend(self.details.failures());
        failures
    }

    /// Counts over what the journals hold right now
    pub fn summary(&self) -> JournalSummary {
        JournalSummary {
            days: self.shallow.len(),
            articles: self.shallow.values().map(Vec::len).sum(),
            distinct_urls: self.shallow_urls().len(),
            details: self.full.len(),
            empty_details: self.full.values().filter(|d| d.is_empty()).count(),
            pending: self.pending_urls().len(),
        }
    }

    pub fn stats(&self) -> &HarvestStats {
        &self.stats
    }

    pub fn shallow(&self) -> &IndexMap<String, Vec<ArticleSummary>> {
        &self.shallow
    }

    pub fn details(&self) -> &IndexMap<String, ArticleDetail> {
        &self.full
    }

    fn shallow_urls(&self) -> IndexSet<&str> {
        self.shallow
            .values()
            .flatten()
            .filter_map(|summary| summary.url.as_deref())
            .collect()
    }
}
