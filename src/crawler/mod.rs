//! Outbound fetching with pacing, classified retry and skip lists
//!
//! This module implements everything that talks to the publisher:
//! the archive pager, the article detail fetcher, and the harvester that
//! drives both sweeps against the journals.

pub mod archive;
pub mod detail;
pub mod fetcher;
pub mod harvester;
pub mod rate_limit;
pub mod skip;

pub use archive::ArchivePager;
pub use detail::ArticleDetailFetcher;
pub use fetcher::HttpFetcher;
pub use harvester::Harvester;
pub use rate_limit::RateLimiter;
pub use skip::SkipList;
