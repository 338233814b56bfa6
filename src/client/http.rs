//! Shared HTTP client construction and response/error helpers.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;

use crate::error::{Result, SpectraError};

/// Build the HTTP client used for both REST calls and agent streams.
///
/// No overall timeout is set here; REST calls apply the configured request
/// timeout per request so long-lived streams are not cut off.
pub fn build_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .build()?)
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {token}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Map a non-success status and its body to an error.
pub fn status_to_error(status: u16, body: &str) -> SpectraError {
    match status {
        401 | 403 => SpectraError::Authentication(error_message(status, body)),
        429 => SpectraError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => SpectraError::api(status, error_message(status, body)),
    }
}

/// Human-readable message from a backend error body.
///
/// The session endpoints answer `{"error": ...}`, the agent service answers
/// `{"detail": ...}`; anything else is passed through verbatim.
pub fn error_message(status: u16, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "detail", "message"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(str::to_string))
        });
    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => format!("HTTP {status}"),
        None => body.trim().to_string(),
    }
}

/// Check the status, then decode the JSON body.
pub async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(status_to_error(status.as_u16(), &body));
    }
    Ok(serde_json::from_str(&body)?)
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("retry_after")
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_error_then_detail_fields() {
        assert_eq!(error_message(500, r#"{"error":"Pod quota exceeded"}"#), "Pod quota exceeded");
        assert_eq!(
            error_message(400, r#"{"detail":"Session already exists"}"#),
            "Session already exists"
        );
        assert_eq!(error_message(502, "Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(502, ""), "HTTP 502");
    }

    #[test]
    fn maps_status_codes_to_error_kinds() {
        assert!(matches!(status_to_error(401, "{}"), SpectraError::Authentication(_)));
        assert!(matches!(
            status_to_error(429, r#"{"retry_after":1.5}"#),
            SpectraError::RateLimited { retry_after_ms: Some(1500) }
        ));
        match status_to_error(500, r#"{"error":"boom"}"#) {
            SpectraError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn bearer_headers_carry_token() {
        let headers = bearer_headers("tok");
        assert_eq!(headers[AUTHORIZATION], "Bearer tok");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }
}
