//! LLM client module
//!
//! The advisor talks to a text-generation model through [`LlmClient`].
//! Providers: `ollama` (default), `openai`, and `none`.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod ollama;
mod openai;
mod retry;
mod types;

pub use client::{DisabledClient, LlmClient};
pub use error::LlmError;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, TokenUsage};

use crate::config::LlmConfig;

/// Create an LLM client based on the provider specified in config
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaClient::from_config(config)?)),
        "openai" => Ok(Arc::new(OpenAIClient::from_config(config)?)),
        "none" => Ok(Arc::new(DisabledClient)),
        other => Err(LlmError::Config(format!(
            "Unknown LLM provider: '{}'. Supported: ollama, openai, none",
            other
        ))),
    }
}
