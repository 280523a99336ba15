//! harvester - Resumable news archive harvester
//!
//! Walks a publisher's archive one calendar day at a time, collecting article
//! summaries from the paginated day archive, then fetches full metadata for
//! every article URL found. Both sweeps write to append-only journals and can
//! be interrupted and resumed without refetching or duplicating anything.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`crawler`] - Pacing, retry, archive paging, detail fetching, orchestration
//! - [`parser`] - Embedded payload parsing and summary extraction
//! - [`models`] - Core data structures and types
//! - [`storage`] - Append-only JSON-lines journals
//! - [`utils`] - Retry state machine, domain errors and helpers
//!
//! # Example
//!
//! ```no_run
//! use harvester::config::Config;
//! use harvester::crawler::Harvester;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let mut harvester = Harvester::from_config(&config)?;
//!     harvester.load()?;
//!     harvester
//!         .shallow_sweep(config.archive.start_date, config.end_date())
//!         .await?;
//!     harvester.detail_sweep(None).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod parser;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::Harvester;
    pub use crate::error::{Error, ErrorCategory, HarvesterErrorTrait, Result};
    pub use crate::models::{ArchivePage, ArticleDetail, ArticleSummary, HarvestDay, HarvestStats};
    pub use crate::storage::JournalStore;
    pub use crate::utils::retry::{FailedFetch, RetryPolicy};
}

// Direct re-exports for convenience
pub use models::{ArticleDetail, ArticleSummary, HarvestDay, HarvestStats};
