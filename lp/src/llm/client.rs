//! LlmClient trait definition

use async_trait::async_trait;
use tracing::debug;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// The advisor sends one self-contained prompt per planning run and never
/// relies on conversation state.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Provider name for logs
    fn provider(&self) -> &str;
}

/// Client used when no provider is configured; every call fails
pub struct DisabledClient;

#[async_trait]
impl LlmClient for DisabledClient {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!("DisabledClient::complete: called");
        Err(LlmError::Disabled)
    }

    fn provider(&self) -> &str {
        "none"
    }
}
