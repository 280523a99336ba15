//! Payload parsing and article extraction
//!
//! This module turns fetched pages into structured data: [`payload`] pulls the
//! embedded JSON out of archive and article HTML, and [`ArticleExtractor`]
//! walks an archive page's content collection into [`ArticleSummary`] records.

pub mod payload;

pub use payload::{parse_archive_html, parse_article_html};

use serde_json::Value;

use crate::models::{ArchivePage, ArticleSummary};

/// Sub-field dropped from every summary (embedded image data)
const IMAGE_FIELD: &str = "image";

/// Extracts article summaries from archive pages
#[derive(Debug, Clone, Copy, Default)]
pub struct ArticleExtractor;

impl ArticleExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Lazily resolve each listed id to its article block on the same page
    ///
    /// Ids without a matching block, or whose block is not a valid summary,
    /// are logged and skipped; the rest of the page is still yielded.
    pub fn extract<'a>(&self, page: &'a ArchivePage) -> impl Iterator<Item = ArticleSummary> + 'a {
        page.article_ids()
            .into_iter()
            .filter_map(move |id| Self::summary(page, &id))
    }

    fn summary(page: &ArchivePage, id: &str) -> Option<ArticleSummary> {
        let Some(block) = page.article_block(id) else {
            tracing::warn!(article_id = id, "Listed article has no detail block, skipping");
            return None;
        };

        let mut block = block.clone();
        block.remove(IMAGE_FIELD);
        block
            .entry("id")
            .or_insert_with(|| Value::String(id.to_string()));

        match serde_json::from_value::<ArticleSummary>(Value::Object(block)) {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!(article_id = id, error = %e, "Malformed article block, skipping");
                None
            }
        }
    }
}
