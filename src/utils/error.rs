//! Error types for the harvester
//!
//! This module defines the domain-specific error types used throughout the application.

use std::path::PathBuf;

use thiserror::Error;

use crate::error::{ErrorCategory, HarvesterErrorTrait};

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error without a usable status code
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status code returned by upstream
    #[error("Status {status} for {url}")]
    Status { status: u16, url: String },

    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// A retryable status kept coming back past its attempt budget
    #[error("Status {status} for {url} persisted after {attempts} attempts")]
    MaxRetriesExceeded {
        status: u16,
        url: String,
        attempts: u32,
    },
}

impl FetchError {
    /// Status code carried by this failure, if upstream answered at all
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::MaxRetriesExceeded { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Timeout(_) => None,
        }
    }

    /// URL the failure refers to
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Status { url, .. }
            | Self::MaxRetriesExceeded { url, .. }
            | Self::Timeout(url) => Some(url),
            Self::Http(e) => e.url().map(|u| u.as_str()),
        }
    }
}

impl HarvesterErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => matches!(status, 403 | 429 | 500..=599),
            Self::MaxRetriesExceeded { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Network
    }
}

/// Errors that can occur while pulling embedded payloads out of pages
#[derive(Error, Debug)]
pub enum ParseError {
    /// Page does not contain the expected marker
    #[error("Payload marker not found: {0}")]
    MarkerNotFound(String),

    /// Embedded payload is not valid JSON
    #[error("Invalid embedded JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Archive payload has no content collection
    #[error("No content collection in archive payload")]
    MissingCollection,

    /// Archive payload has no readable pagination links
    #[error("No pagination links in archive payload")]
    MissingPagination,
}

impl HarvesterErrorTrait for ParseError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Parsing
    }
}

/// Errors raised by the append-only journal files
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the journal file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record in the middle of the journal could not be decoded
    #[error("Corrupt record at {path}:{line}: {source}")]
    CorruptRecord {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Value could not be serialized for appending
    #[error("Failed to serialize record for key {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl HarvesterErrorTrait for StoreError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }
}

/// Errors that abort a harvest sweep
#[derive(Error, Debug)]
pub enum HarvestError {
    /// An archive day could not be fetched
    #[error("Archive day {day} failed: {source}")]
    Day {
        day: String,
        #[source]
        source: FetchError,
    },

    /// Fetch error outside any specific day
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Persisting a record failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Start date lies after end date
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}

impl HarvesterErrorTrait for HarvestError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Day { source, .. } => source.is_recoverable(),
            Self::Fetch(e) => e.is_recoverable(),
            Self::Store(e) => e.is_recoverable(),
            Self::InvalidDateRange { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Day { .. } | Self::Fetch(_) => ErrorCategory::Network,
            Self::Store(_) => ErrorCategory::Storage,
            Self::InvalidDateRange { .. } => ErrorCategory::Config,
        }
    }
}
