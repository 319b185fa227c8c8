//! Maps raw remote answers onto the adapter's outcome kinds.
//!
//! The remote site signals rate limiting inconsistently (sometimes 429,
//! sometimes a 403 or a 200 with a message), so body markers are checked
//! before status codes. The marker list is a heuristic and is not expected
//! to be complete.

use crate::http::RemoteResponse;

/// Phrases matched verbatim.
const RATE_LIMIT_MARKERS: &[&str] = &["1 Order per minute", "Maximum"];
/// Phrases matched case-insensitively.
const RATE_LIMIT_MARKERS_CI: &[&str] = &["rate limit", "too many requests"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseClass {
    Success,
    /// The anti-forgery token (or the session behind it) was rejected
    TokenRejected,
    RateLimited { message: String },
    Duplicate { message: String },
    Failed { status: u16, message: String },
}

pub fn classify(response: &RemoteResponse) -> ResponseClass {
    if response.status == 429 {
        return ResponseClass::RateLimited {
            message: summarize(response),
        };
    }

    if response.is_success() {
        // A 2xx JSON error object can still carry a rate-limit message.
        if let Some(message) = json_failure_message(&response.body)
            && has_rate_limit_marker(&message)
        {
            return ResponseClass::RateLimited { message };
        }
        return ResponseClass::Success;
    }

    if has_rate_limit_marker(&response.body) {
        return ResponseClass::RateLimited {
            message: summarize(response),
        };
    }

    match response.status {
        409 => ResponseClass::Duplicate {
            message: summarize(response),
        },
        403 => ResponseClass::TokenRejected,
        status => ResponseClass::Failed {
            status,
            message: summarize(response),
        },
    }
}

pub fn has_rate_limit_marker(text: &str) -> bool {
    if RATE_LIMIT_MARKERS.iter().any(|m| text.contains(m)) {
        return true;
    }
    let lower = text.to_lowercase();
    RATE_LIMIT_MARKERS_CI.iter().any(|m| lower.contains(m))
}

/// `message` of a JSON error object, if the body is one.
fn json_message(body: &str) -> Option<String> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

/// `message` of a JSON object that reports `"success": false`.
fn json_failure_message(body: &str) -> Option<String> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    if value.get("success").and_then(|s| s.as_bool()) != Some(false) {
        return None;
    }
    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

/// Short description of a failed response for error messages.
fn summarize(response: &RemoteResponse) -> String {
    if let Some(message) = json_message(&response.body) {
        return message;
    }
    let text = response.body.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return format!("HTTP {}", response.status);
    }
    match text.char_indices().nth(200) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        assert_eq!(
            classify(&RemoteResponse::new(200, "<div class=\"card\"></div>")),
            ResponseClass::Success
        );
    }

    #[test]
    fn test_forbidden_is_token_rejection() {
        assert_eq!(
            classify(&RemoteResponse::new(403, "Invalid CSRF token")),
            ResponseClass::TokenRejected
        );
    }

    #[test]
    fn test_forbidden_with_rate_limit_message_is_rate_limited() {
        let response = RemoteResponse::new(403, r#"{"message":"1 Order per minute"}"#);
        assert_eq!(
            classify(&response),
            ResponseClass::RateLimited {
                message: "1 Order per minute".into()
            }
        );
    }

    #[test]
    fn test_status_429_and_text_markers() {
        assert!(matches!(
            classify(&RemoteResponse::new(429, "")),
            ResponseClass::RateLimited { .. }
        ));
        assert!(matches!(
            classify(&RemoteResponse::new(503, "Too Many Requests, slow down")),
            ResponseClass::RateLimited { .. }
        ));
    }

    #[test]
    fn test_success_json_with_marker_is_rate_limited() {
        let response =
            RemoteResponse::new(200, r#"{"success":false,"message":"Maximum orders reached"}"#);
        assert!(matches!(classify(&response), ResponseClass::RateLimited { .. }));
    }

    #[test]
    fn test_success_json_without_failure_flag_is_success() {
        for body in [
            r#"{"success":true,"message":"Maximum 3 sauces"}"#,
            r#"{"message":"Maximum 3 sauces"}"#,
        ] {
            assert_eq!(classify(&RemoteResponse::new(200, body)), ResponseClass::Success);
        }
    }

    #[test]
    fn test_success_html_mentioning_maximum_is_not_rate_limited() {
        let response = RemoteResponse::new(200, "<p>Maximum 3 sauces</p>");
        assert_eq!(classify(&response), ResponseClass::Success);
    }

    #[test]
    fn test_conflict_is_duplicate() {
        assert_eq!(
            classify(&RemoteResponse::new(409, r#"{"message":"Order already exists"}"#)),
            ResponseClass::Duplicate {
                message: "Order already exists".into()
            }
        );
    }

    #[test]
    fn test_other_failures_keep_status() {
        assert_eq!(
            classify(&RemoteResponse::new(500, "")),
            ResponseClass::Failed {
                status: 500,
                message: "HTTP 500".into()
            }
        );
    }
}
