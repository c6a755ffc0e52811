//! Map non-success HTTP responses onto the call error taxonomy.
//!
//! | Response                                              | Classification   |
//! |-------------------------------------------------------|------------------|
//! | 429, `RESOURCE_EXHAUSTED`                             | QuotaExceeded    |
//! | 401, 403, 400 with `API_KEY_INVALID` / "API key not valid" | AuthInvalid |
//! | 408, 5xx                                              | TransientNetwork |
//! | 404 and remaining 4xx                                 | ModelUnavailable |

use serde::Deserialize;
use std::time::Duration;

use crate::error::CallError;

const RETRY_INFO_TYPE: &str = "type.googleapis.com/google.rpc.RetryInfo";

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "@type", default)]
    type_url: String,
    #[serde(rename = "retryDelay")]
    retry_delay: Option<String>,
    reason: Option<String>,
}

/// Classify a failed response from its status, `Retry-After` header, and body.
pub fn classify_failure(status: u16, retry_after: Option<&str>, body: &str) -> CallError {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let error = envelope.error;
    let message = if error.message.is_empty() {
        format!("HTTP {status}: {}", truncate(body, 200))
    } else {
        format!("HTTP {status}: {}", error.message)
    };

    let key_rejected = error
        .details
        .iter()
        .any(|d| d.reason.as_deref() == Some("API_KEY_INVALID"))
        || error.message.contains("API key not valid")
        || error.message.contains("API key expired");

    if status == 429 || error.status == "RESOURCE_EXHAUSTED" {
        let hint = error
            .details
            .iter()
            .filter(|d| d.type_url == RETRY_INFO_TYPE)
            .find_map(|d| d.retry_delay.as_deref().and_then(parse_retry_delay))
            .or_else(|| retry_after.and_then(parse_retry_after));
        return CallError::QuotaExceeded {
            retry_after: hint,
            message,
        };
    }

    match status {
        401 | 403 => CallError::AuthInvalid(message),
        400 if key_rejected => CallError::AuthInvalid(message),
        408 | 500..=599 => CallError::TransientNetwork(message),
        _ => CallError::ModelUnavailable(message),
    }
}

/// Parse a protobuf duration string such as `"17s"` or `"1.5s"`.
pub fn parse_retry_delay(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().strip_suffix('s')?.parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn truncate(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(max_chars).collect();
        format!("{head}…")
    }
}
