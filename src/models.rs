// Core data structures for the harvester

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Prefix of the archive payload key holding the day's content collection
pub const CONTENT_KEY_PREFIX: &str = "allesseh_content_full_";

/// Prefix of the archive payload keys holding per-article blocks
pub const ARTICLE_KEY_PREFIX: &str = "article|capi_";

/// Calendar day of the archive; key of the shallow journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HarvestDay(NaiveDate);

impl HarvestDay {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Journal key: `YYYY-MM-DD`
    pub fn key(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// Archive path segment: `YYYY/MM/DD`
    pub fn archive_path(&self) -> String {
        format!(
            "{:04}/{:02}/{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day()
        )
    }

    /// Every day from `end` back to `start`, both inclusive
    pub fn newest_first(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = HarvestDay> {
        let days = (end - start).num_days().max(-1) + 1;
        (0..days).map(move |offset| Self(end - Duration::days(offset)))
    }
}

impl fmt::Display for HarvestDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for HarvestDay {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Self)
    }
}

/// Embedded state payload of one archive page
///
/// Only a few key paths are relied upon; everything else is opaque publisher data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArchivePage {
    payload: Value,
}

impl ArchivePage {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// Page with no payload at all (skipped, tolerated or malformed)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// The `data` object, if present
    pub fn data(&self) -> Option<&Map<String, Value>> {
        self.payload.get("data").and_then(Value::as_object)
    }

    /// Inner block of the content collection: `data[<allesseh_content_full_*>].data`
    pub fn content(&self) -> Option<&Value> {
        let data = self.data()?;
        let (_, block) = data
            .iter()
            .find(|(key, _)| key.starts_with(CONTENT_KEY_PREFIX))?;
        block.get("data")
    }

    /// Article ids listed in the content collection, in page order
    pub fn article_ids(&self) -> Vec<String> {
        self.content()
            .and_then(|c| c.get("collection"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Detail block for one article id: `data["article|capi_<id>"].data.data`
    pub fn article_block(&self, id: &str) -> Option<&Map<String, Value>> {
        self.data()?
            .get(&format!("{ARTICLE_KEY_PREFIX}{id}"))?
            .get("data")?
            .get("data")?
            .as_object()
    }
}

/// Lightweight per-article metadata taken from an archive page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,

    /// Publisher-specific fields, kept as-is
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Full metadata for one article URL, or the empty sentinel
///
/// The sentinel is written as `{}` so a URL that yielded nothing is still
/// recorded and never fetched again.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ArticleDetail {
    Found(Value),
    #[default]
    Empty,
}

impl ArticleDetail {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl Serialize for ArticleDetail {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Found(value) => value.serialize(serializer),
            Self::Empty => Map::new().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ArticleDetail {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Null => Self::Empty,
            Value::Object(ref map) if map.is_empty() => Self::Empty,
            other => Self::Found(other),
        })
    }
}

/// Counters for one harvest run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestStats {
    /// Days fetched and appended this run
    pub days_fetched: u64,

    /// Days skipped because the journal already had them
    pub days_present: u64,

    /// Summaries extracted this run
    pub articles_extracted: u64,

    /// Article URLs fetched and appended this run
    pub urls_fetched: u64,

    /// Article URLs skipped because the journal already had them
    pub urls_present: u64,

    /// Empty sentinels among the URLs fetched this run
    pub empty_details: u64,

    /// Tolerated failures recorded this run
    pub tolerated_failures: u64,
}

/// Counts over the loaded journals, independent of any run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JournalSummary {
    pub days: usize,
    pub articles: usize,
    pub distinct_urls: usize,
    pub details: usize,
    pub empty_details: usize,
    pub pending: usize,
}
