//! # HTTP Utilities
//!
//! Response handling for lookup clients: strict JSON parsing with a readable
//! error, and short hints for status codes a user may hit.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Return a user-friendly hint for status codes the product database is known to return.
///
/// # Example
/// ```rust
/// use shelfscan_util::http::status_error_message;
///
/// let not_found = status_error_message(404).unwrap();
/// assert!(not_found.contains("Not Found"));
///
/// let throttled = status_error_message(429).unwrap();
/// assert!(throttled.contains("rate limit"));
///
/// assert!(status_error_message(418).is_none());
/// ```
pub fn status_error_message(status_code: u16) -> Option<String> {
    match status_code {
        404 => Some("Not Found (404). The product database has no page for this barcode".into()),
        429 => Some("Too Many Requests (429). Hint: the product database rate limit was hit; scan again shortly".into()),
        500..=599 => Some(format!("Server error ({status_code}). The product database is unavailable")),
        _ => None,
    }
}

/// Longest body preview kept in a [`JsonParseError`], in characters.
pub const BODY_PREVIEW_CHARS: usize = 200;

/// Parse a response body that must be JSON.
///
/// A body that fails to parse, such as an HTML error page from a proxy,
/// yields a [`JsonParseError`] carrying the status and a single-line preview
/// of at most [`BODY_PREVIEW_CHARS`] characters.
///
/// # Example
/// ```rust
/// use shelfscan_util::http::parse_response_json_strict;
///
/// let value = parse_response_json_strict(r#"{"status": 1}"#, None).unwrap();
/// assert_eq!(value["status"], 1);
///
/// let error = parse_response_json_strict("<html>\n</html>", None).unwrap_err();
/// assert_eq!(error.body_preview(), "<html> </html>");
/// ```
pub fn parse_response_json_strict(text: &str, status: Option<StatusCode>) -> Result<Value, JsonParseError> {
    serde_json::from_str(text).map_err(|source| JsonParseError {
        status: status.map(|code| code.as_u16()),
        body_preview: body_preview(text, BODY_PREVIEW_CHARS),
        source,
    })
}

/// Collapse runs of whitespace to single spaces and cut at `max_chars`.
fn body_preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "<empty>".to_string();
    }
    match collapsed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &collapsed[..cut]),
        None => collapsed,
    }
}

/// Error returned when a response body that must be JSON is not.
#[derive(Debug, Error)]
#[error("response{} is not valid JSON: {source}; body: {body_preview}", status_suffix(.status))]
pub struct JsonParseError {
    status: Option<u16>,
    #[source]
    source: serde_json::Error,
    body_preview: String,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" (status {code})")).unwrap_or_default()
}

impl JsonParseError {
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Single-line, truncated copy of the offending body.
    pub fn body_preview(&self) -> &str {
        &self.body_preview
    }

    pub fn source_error(&self) -> &serde_json::Error {
        &self.source
    }
}
