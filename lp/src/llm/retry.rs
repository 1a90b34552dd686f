//! Retry policy shared by the HTTP providers

use std::time::Duration;

/// Maximum number of retries for transient errors
pub(crate) const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
pub(crate) const INITIAL_BACKOFF_MS: u64 = 1000;

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// `retry-after` header in seconds, 60s when absent or unparseable
pub(crate) fn retry_after(response: &reqwest::Response) -> Duration {
    let secs = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(60);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(is_retryable_status(status), "{status}");
        }
        for status in [200, 400, 401, 404, 501] {
            assert!(!is_retryable_status(status), "{status}");
        }
    }
}
