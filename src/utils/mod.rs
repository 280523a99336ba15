//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use regex::Regex;
use std::sync::OnceLock;

use crate::utils::error::ParseError;

/// Cut the text between `marker` and the next `</script>` tag
///
/// Surrounding whitespace and a trailing `;` are stripped.
pub fn embedded_payload<'a>(html: &'a str, marker: &str) -> Result<&'a str, ParseError> {
    let start = html
        .find(marker)
        .map(|idx| idx + marker.len())
        .ok_or_else(|| ParseError::MarkerNotFound(marker.to_string()))?;

    let rest = &html[start..];
    let end = rest.find("</script>").unwrap_or(rest.len());

    Ok(rest[..end].trim().trim_end_matches(';').trim_end())
}

/// Page number from a pagination link such as `/news/archive/2024/01/02?page=3`
pub fn page_number(link: &str) -> Option<u32> {
    static PAGE_RE: OnceLock<Regex> = OnceLock::new();

    let re = PAGE_RE.get_or_init(|| Regex::new(r"[?&]page=(\d+)").expect("Invalid regex pattern"));

    re.captures(link)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Truncate text to a maximum length
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
