//! Known-bad inputs that are never requested
//!
//! A handful of archive pages and article URLs fail deterministically upstream.
//! They are listed here and checked before any fetch is built, so they never
//! burn a retry budget.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One archive page that is known to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkipPage {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub page: u32,
}

impl SkipPage {
    pub const fn new(year: i32, month: u32, day: u32, page: u32) -> Self {
        Self {
            year,
            month,
            day,
            page,
        }
    }
}

/// Archive pages observed to return 500 on every attempt
pub const DEFAULT_SKIP_PAGES: &[SkipPage] = &[
    SkipPage::new(2009, 6, 19, 3),
    SkipPage::new(2009, 5, 22, 2),
];

/// Article URLs observed to fail on every attempt
pub const DEFAULT_SKIP_URLS: &[&str] = &[
    "https://www.wsj.com/articles/materiality-assessments-what-businesses-need-to-know-be994aa9",
    "https://www.wsj.com/articles/scope-3-emissions-what-businesses-need-to-know-b8444011",
    "https://www.wsj.com/articles/fraport-steps-up-2030-carbon-target-17b6b82",
    "https://www.wsj.com/Tech/your-share-of-the-725m-facebook-settlement-will-be-tiny-93265db0",
];

/// Pre-flight guard consulted before every archive page and article fetch
#[derive(Debug, Clone, Default)]
pub struct SkipList {
    pages: HashSet<SkipPage>,
    urls: HashSet<String>,
}

impl SkipList {
    pub fn new(
        pages: impl IntoIterator<Item = SkipPage>,
        urls: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            pages: pages.into_iter().collect(),
            urls: urls.into_iter().collect(),
        }
    }

    /// The built-in list of known-bad inputs
    pub fn builtin() -> Self {
        Self::new(
            DEFAULT_SKIP_PAGES.iter().copied(),
            DEFAULT_SKIP_URLS.iter().map(|u| (*u).to_string()),
        )
    }

    pub fn is_page_skipped(&self, date: NaiveDate, page: u32) -> bool {
        self.pages.contains(&SkipPage::new(
            date.year(),
            date.month(),
            date.day(),
            page,
        ))
    }

    pub fn is_url_skipped(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.pages.len() + self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
