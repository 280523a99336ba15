//! Embedded JSON payloads
//!
//! Archive pages carry their state in an inline script assigned to
//! `window.__STATE__`; article pages carry theirs in a
//! `<script id="__NEXT_DATA__" type="application/json">` element.

use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;

use crate::models::ArchivePage;
use crate::utils::embedded_payload;
use crate::utils::error::ParseError;

/// Marker preceding the archive page state
pub const ARCHIVE_STATE_MARKER: &str = "window.__STATE__ =";

/// Selector of the article page data script
pub const ARTICLE_DATA_SELECTOR: &str = r#"script#__NEXT_DATA__[type="application/json"]"#;

/// Parse the state payload of an archive page
///
/// # Errors
///
/// Returns `ParseError::MarkerNotFound` when the page has no state script and
/// `ParseError::InvalidJson` when the script body does not parse.
pub fn parse_archive_html(html: &str) -> Result<ArchivePage, ParseError> {
    let json = embedded_payload(html, ARCHIVE_STATE_MARKER)?;
    let payload: Value = serde_json::from_str(json)?;
    Ok(ArchivePage::new(payload))
}

/// Parse the data payload of an article page
///
/// Returns `Ok(None)` when the page has no data script, meaning it is not a
/// recognised article template.
///
/// # Errors
///
/// Returns `ParseError::InvalidJson` when the script exists but does not parse.
pub fn parse_article_html(html: &str) -> Result<Option<Value>, ParseError> {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();

    let selector = SELECTOR
        .get_or_init(|| Selector::parse(ARTICLE_DATA_SELECTOR).expect("Invalid selector"));

    let document = Html::parse_document(html);
    let Some(script) = document.select(selector).next() else {
        return Ok(None);
    };

    let text: String = script.text().collect();
    let payload = serde_json::from_str(text.trim())?;
    Ok(Some(payload))
}
