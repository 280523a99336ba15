//! Durable harvest state
//!
//! Two append-only journals hold everything the harvester knows:
//!
//! - shallow: `YYYY-MM-DD` → the day's article summaries
//! - detail: article URL → full metadata or the empty sentinel
//!
//! In-memory maps are rebuilt from these at startup and only updated after the
//! corresponding record has been appended.

pub mod journal;

pub use journal::JournalStore;

use crate::config::StorageConfig;
use crate::models::{ArticleDetail, ArticleSummary};

/// Day → summaries journal
pub type ShallowStore = JournalStore<Vec<ArticleSummary>>;

/// URL → detail journal
pub type DetailStore = JournalStore<ArticleDetail>;

/// Open both journals described by `config`
pub fn open_stores(config: &StorageConfig) -> (ShallowStore, DetailStore) {
    (
        JournalStore::new(&config.shallow_path).with_sync(config.sync_writes),
        JournalStore::new(&config.detail_path).with_sync(config.sync_writes),
    )
}
