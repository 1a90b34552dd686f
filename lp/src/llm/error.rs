//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM provider disabled")]
    Disabled,
}

impl LlmError {
    /// Check if this is a rate limit error
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => *status >= 500,
            LlmError::Network(_) => true,
            LlmError::Timeout(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::Json(_) => false,
            LlmError::Config(_) => false,
            LlmError::Disabled => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_rate_limit() {
        let err = LlmError::RateLimited {
            retry_after: Duration::from_secs(60),
        };
        assert!(err.is_rate_limit());
        assert!(!LlmError::Disabled.is_rate_limit());
    }

    #[test]
    fn test_is_retryable() {
        assert!(
            LlmError::ApiError {
                status: 503,
                message: "unavailable".to_string()
            }
            .is_retryable()
        );
        assert!(
            !LlmError::ApiError {
                status: 400,
                message: "Bad request".to_string()
            }
            .is_retryable()
        );
        assert!(LlmError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!LlmError::InvalidResponse("Bad JSON".to_string()).is_retryable());
        assert!(!LlmError::Disabled.is_retryable());
        assert!(!LlmError::Config("no key".to_string()).is_retryable());
    }
}
