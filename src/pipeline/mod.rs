//! Pipeline stages for one upload/analyze attempt.
//!
//! Each submodule implements exactly one network-bound step. Keeping the
//! stages separate makes each independently testable and keeps the
//! orchestrator a pure sequencing concern.
//!
//! ## Data Flow
//!
//! ```text
//! capture ──▶ authorize ──▶ upload ──▶ extract
//! (frame)    (signed URL)  (PUT blob) (query answers)
//! ```
//!
//! 1. [`authorize`] — request a time-limited write authorization naming
//!    the captured file
//! 2. [`upload`]    — PUT the captured bytes to the authorized URL with a
//!    matching content type
//! 3. [`extract`]   — run the fixed query list against the stored object
//!
//! The three calls are strictly sequential; each stage maps its HTTP
//! failures into the matching [`crate::error::ScanError`] variant with the
//! server's own error message preserved verbatim.

pub mod authorize;
pub mod extract;
pub mod upload;

use crate::model::ErrorBody;

/// Extract a human-readable reason from an error response body.
///
/// Both backend operations answer failures with a JSON `{error}` body
/// (extraction failures add a `message`); anything else falls back to the
/// bare status code.
pub(crate) fn reason_from_body(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => match parsed.message {
            Some(message) => format!("{}: {}", parsed.error, message),
            None => parsed.error,
        },
        Err(_) => format!("HTTP {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_prefers_structured_error() {
        assert_eq!(
            reason_from_body(400, r#"{"error":"fileName and fileType are required"}"#),
            "fileName and fileType are required"
        );
    }

    #[test]
    fn reason_appends_engine_message() {
        assert_eq!(
            reason_from_body(
                500,
                r#"{"error":"Failed to process document","message":"quota exceeded"}"#
            ),
            "Failed to process document: quota exceeded"
        );
    }

    #[test]
    fn reason_falls_back_to_status() {
        assert_eq!(reason_from_body(502, "<html>bad gateway</html>"), "HTTP 502");
    }
}
