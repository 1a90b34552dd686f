//! LLM request/response types
//!
//! Provider-agnostic: each client maps these onto its own wire format.

use serde::{Deserialize, Serialize};

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt
    pub system_prompt: String,

    /// User messages (the advisor sends exactly one)
    pub messages: Vec<Message>,

    /// Max tokens for response (capped by config)
    pub max_tokens: u32,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Text content (if any)
    pub content: Option<String>,

    /// Token usage as reported by the provider
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Plain text response with no usage figures
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            usage: TokenUsage::default(),
        }
    }
}

/// Token usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
