// ABOUTME: Error types for the TrialGuard backend client
// ABOUTME: Upstream failures, stream assembly failures and upload rejections

use serde_json::Value;
use thiserror::Error;

/// Maximum number of characters of a raw error body surfaced to the user
const RAW_BODY_LIMIT: usize = 200;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Non-success status before any streaming began
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// The analysis stream reported a failure through an `error` event
    #[error("{0}")]
    AnalysisFailed(String),

    /// Stream ended mid-block or a `complete` event could not be parsed
    #[error("Malformed analysis stream: {0}")]
    MalformedStream(String),

    /// Stream ended cleanly without a `complete` event
    #[error("Analysis finished without producing a result")]
    NoResult,

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("No protocol data could be extracted from the PDF")]
    EmptyExtraction,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn upstream(status: u16, body: &str) -> Self {
        ClientError::Upstream {
            status,
            message: upstream_error_message(status, body),
        }
    }
}

/// Human-readable message for a failed response body.
///
/// Priority: `detail` (string, or a list of `{loc, msg}` entries), then an
/// `errors` list of `{field, message}` entries joined by `; `, then the raw
/// body truncated to 200 characters, then a generic status message.
pub fn upstream_error_message(status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(detail) = json.get("detail") {
            match detail {
                Value::String(s) if !s.is_empty() => return s.clone(),
                Value::Array(entries) if !entries.is_empty() => {
                    return join_entries(entries, "loc", "msg");
                }
                _ => {}
            }
        }
        if let Some(Value::Array(entries)) = json.get("errors") {
            if !entries.is_empty() {
                return join_entries(entries, "field", "message");
            }
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.chars().take(RAW_BODY_LIMIT).collect();
    }

    format!("Request failed with status {}", status)
}

fn join_entries(entries: &[Value], field_key: &str, message_key: &str) -> String {
    entries
        .iter()
        .map(|entry| {
            let field = match entry.get(field_key) {
                Some(Value::String(s)) => s.clone(),
                // FastAPI reports locations as ["body", "protocol", "phase"]
                Some(Value::Array(parts)) => parts
                    .iter()
                    .filter_map(|p| match p {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("."),
                _ => String::new(),
            };
            let message = entry
                .get(message_key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| entry.to_string());
            if field.is_empty() {
                message
            } else {
                format!("{}: {}", field, message)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detail_string() {
        assert_eq!(upstream_error_message(400, r#"{"detail": "bad request"}"#), "bad request");
    }

    #[test]
    fn test_detail_takes_priority_over_errors() {
        let body = r#"{"detail": "Protocol data cannot be empty", "errors": [{"field": "x", "message": "y"}]}"#;
        assert_eq!(upstream_error_message(400, body), "Protocol data cannot be empty");
    }

    #[test]
    fn test_errors_list() {
        let body = r#"{"errors": [
            {"field": "trial_name", "message": "too short"},
            {"field": "phase", "message": "required"}
        ]}"#;
        assert_eq!(
            upstream_error_message(422, body),
            "trial_name: too short; phase: required"
        );
    }

    #[test]
    fn test_fastapi_validation_detail() {
        let body = r#"{"detail": [{"loc": ["body", "protocol"], "msg": "field required", "type": "missing"}]}"#;
        assert_eq!(upstream_error_message(422, body), "body.protocol: field required");
    }

    #[test]
    fn test_raw_text_is_truncated() {
        let body = "x".repeat(500);
        let message = upstream_error_message(502, &body);
        assert_eq!(message.chars().count(), 200);
    }

    #[test]
    fn test_raw_text_truncation_respects_char_boundaries() {
        let body = "é".repeat(300);
        assert_eq!(upstream_error_message(500, &body), "é".repeat(200));
    }

    #[test]
    fn test_empty_body_falls_back_to_status() {
        assert_eq!(upstream_error_message(503, ""), "Request failed with status 503");
        assert_eq!(upstream_error_message(503, "   "), "Request failed with status 503");
    }

    #[test]
    fn test_upstream_error_displays_message_only() {
        let err = ClientError::upstream(400, r#"{"detail": "bad request"}"#);
        assert_eq!(err.to_string(), "bad request");
    }
}
