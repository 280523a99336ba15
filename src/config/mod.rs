//! Configuration management for the harvester
//!
//! This module handles loading and validating configuration from TOML files
//! and environment variables.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::crawler::skip::{SkipList, SkipPage, DEFAULT_SKIP_PAGES, DEFAULT_SKIP_URLS};
use crate::utils::retry::{Exhaustion, RetryPolicy};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP client configuration
    pub http: HttpConfig,

    /// Archive paging configuration
    pub archive: ArchiveConfig,

    /// Article detail configuration
    pub detail: DetailConfig,

    /// Journal file configuration
    pub storage: StorageConfig,

    /// Known-bad inputs
    pub skip: SkipConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User agent string
    pub user_agent: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Archive paging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Site root the archive lives under
    pub base_url: String,

    /// Oldest day to harvest
    pub start_date: NaiveDate,

    /// Newest day to harvest (today when unset)
    pub end_date: Option<NaiveDate>,

    /// Minimum gap between archive requests in milliseconds
    pub min_interval_ms: u64,

    /// Retry table for archive pages
    pub retry: RetryConfig,
}

/// Article detail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailConfig {
    /// Minimum gap between article requests in milliseconds
    pub min_interval_ms: u64,

    /// Retry table for article pages
    pub retry: RetryConfig,
}

/// Retry table as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts allowed per status code
    pub max_attempts: u32,

    /// Sleep after a tolerated failure in milliseconds
    pub cooldown_ms: u64,

    /// Behaviour once a status code's attempts are spent
    pub on_exhausted: Exhaustion,

    /// Retryable status codes
    pub rules: Vec<BackoffRule>,

    /// Backoff after a timeout or connection failure in milliseconds (given up at once when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_backoff_ms: Option<u64>,
}

/// One retryable status code and its backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffRule {
    pub status: u16,
    pub backoff_ms: u64,
}

/// Journal file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Day → summaries journal
    pub shallow_path: PathBuf,

    /// URL → detail journal
    pub detail_path: PathBuf,

    /// Flush every record to disk before continuing
    pub sync_writes: bool,
}

/// Known-bad inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipConfig {
    pub pages: Vec<SkipPage>,
    pub urls: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from defaults plus environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// File (when given) or defaults, then environment overrides, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `HARVESTER_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("HARVESTER_BASE_URL") {
            self.archive.base_url = v;
        }
        if let Ok(v) = std::env::var("HARVESTER_START_DATE") {
            self.archive.start_date = parse_date(&v).context("HARVESTER_START_DATE")?;
        }
        if let Ok(v) = std::env::var("HARVESTER_END_DATE") {
            self.archive.end_date = Some(parse_date(&v).context("HARVESTER_END_DATE")?);
        }
        if let Ok(v) = std::env::var("HARVESTER_SHALLOW_PATH") {
            self.storage.shallow_path = v.into();
        }
        if let Ok(v) = std::env::var("HARVESTER_DETAIL_PATH") {
            self.storage.detail_path = v.into();
        }
        if let Ok(v) = std::env::var("HARVESTER_USER_AGENT") {
            self.http.user_agent = v;
        }
        if let Some(v) = env_parse::<u64>("HARVESTER_REQUEST_TIMEOUT") {
            self.http.request_timeout_secs = v;
        }
        if let Some(v) = env_parse::<u64>("HARVESTER_DETAIL_INTERVAL_MS") {
            self.detail.min_interval_ms = v;
        }
        if let Ok(v) = std::env::var("HARVESTER_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("HARVESTER_LOG_FORMAT") {
            self.logging.format = v;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.archive.base_url)
            .with_context(|| format!("Invalid archive base_url: {}", self.archive.base_url))?;

        if let Some(end) = self.archive.end_date {
            if end < self.archive.start_date {
                anyhow::bail!(
                    "end_date {end} is before start_date {}",
                    self.archive.start_date
                );
            }
        }

        self.archive.retry.validate().context("archive.retry")?;
        self.detail.retry.validate().context("detail.retry")?;

        if self.http.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.storage.shallow_path == self.storage.detail_path {
            anyhow::bail!("shallow_path and detail_path must differ");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be text or json");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    /// Newest day to harvest
    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        self.archive
            .end_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Skip list built from the configured entries
    #[must_use]
    pub fn skip_list(&self) -> SkipList {
        SkipList::new(self.skip.pages.iter().copied(), self.skip.urls.iter().cloned())
    }
}

impl RetryConfig {
    /// Validate retry table values
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            anyhow::bail!("max_attempts must be greater than 0");
        }
        if self.rules.is_empty() {
            anyhow::bail!("at least one retryable status is required");
        }
        if let Some(rule) = self.rules.iter().find(|r| !(100..=599).contains(&r.status)) {
            anyhow::bail!("{} is not an HTTP status code", rule.status);
        }
        Ok(())
    }

    /// Policy consumed by the retrying fetcher
    #[must_use]
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: self
                .rules
                .iter()
                .map(|r| (r.status, Duration::from_millis(r.backoff_ms)))
                .collect(),
            transport: self.transport_backoff_ms.map(Duration::from_millis),
            cooldown: Duration::from_millis(self.cooldown_ms),
            on_exhausted: self.on_exhausted,
        }
    }
}

impl From<&RetryPolicy> for RetryConfig {
    fn from(policy: &RetryPolicy) -> Self {
        Self {
            max_attempts: policy.max_attempts,
            cooldown_ms: policy.cooldown.as_millis() as u64,
            on_exhausted: policy.on_exhausted,
            rules: policy
                .backoff
                .iter()
                .map(|(status, backoff)| BackoffRule {
                    status: *status,
                    backoff_ms: backoff.as_millis() as u64,
                })
                .collect(),
            transport_backoff_ms: policy.transport.map(|d| d.as_millis() as u64),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("harvester/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://www.wsj.com"),
            start_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            end_date: None,
            min_interval_ms: 0,
            retry: RetryConfig::from(&RetryPolicy::archive()),
        }
    }
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 12,
            retry: RetryConfig::from(&RetryPolicy::detail()),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            shallow_path: PathBuf::from("data/shallow_article_data.jsonl"),
            detail_path: PathBuf::from("data/full_article_data.jsonl"),
            sync_writes: true,
        }
    }
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            pages: DEFAULT_SKIP_PAGES.to_vec(),
            urls: DEFAULT_SKIP_URLS.iter().map(|u| (*u).to_string()).collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date {s:?}, expected YYYY-MM-DD"))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
