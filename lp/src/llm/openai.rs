//! OpenAI API client implementation
//!
//! Implements the LlmClient trait for OpenAI's Chat Completions API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::retry::{INITIAL_BACKOFF_MS, MAX_RETRIES, is_retryable_status, retry_after};
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, TokenUsage};
use crate::config::LlmConfig;

/// OpenAI API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAIClient {
    /// Create a new client from configuration
    ///
    /// Fails when the API key environment variable is unset.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, "OpenAIClient::from_config: called");
        let api_key = config.api_key().map_err(|e| LlmError::Config(e.to_string()))?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.resolved_base_url(),
            http,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Build the request body for the OpenAI API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];
        messages.extend(request.messages.iter().map(|m| {
            serde_json::json!({
                "role": m.role.as_str(),
                "content": m.content,
            })
        }));

        let max_tokens = request.max_tokens.min(self.max_tokens);

        // o1/o3 and gpt-5 models take max_completion_tokens instead of max_tokens
        let uses_completion_tokens =
            self.model.starts_with("gpt-5") || self.model.starts_with("o1") || self.model.starts_with("o3");

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });

        if uses_completion_tokens {
            body["max_completion_tokens"] = serde_json::json!(max_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    fn parse_response(&self, api_response: OpenAIResponse) -> CompletionResponse {
        let content = api_response.choices.into_iter().next().and_then(|c| c.message.content);
        let usage = api_response
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();
        CompletionResponse { content, usage }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(&request);

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(
                    attempt,
                    backoff_ms = backoff,
                    "complete: retrying after transient error"
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self
                .http
                .post(url.clone())
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "complete: network error");
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if status == 429 {
                debug!("complete: rate limited (429)");
                return Err(LlmError::RateLimited {
                    retry_after: retry_after(&response),
                });
            }

            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "complete: retryable error");
                last_error = Some(LlmError::ApiError { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                debug!(%status, "complete: API error");
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::ApiError { status, message: text });
            }

            debug!("complete: success");
            let api_response: OpenAIResponse = response.json().await?;
            return Ok(self.parse_response(api_response));
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
    }

    fn provider(&self) -> &str {
        "openai"
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    fn client(model: &str, max_tokens: u32) -> OpenAIClient {
        OpenAIClient {
            model: model.to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://api.openai.com".to_string(),
            http: Client::new(),
            max_tokens,
            temperature: 0.2,
        }
    }

    #[test]
    fn test_build_request_body_basic() {
        let request = CompletionRequest {
            system_prompt: "You are helpful".to_string(),
            messages: vec![Message::user("Hello")],
            max_tokens: 1000,
        };

        let body = client("gpt-4o", 8192).build_request_body(&request);

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are helpful");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Hello");
        assert!(body.get("max_completion_tokens").is_none());
    }

    #[test]
    fn test_max_tokens_capped() {
        let request = CompletionRequest {
            system_prompt: "Test".to_string(),
            messages: vec![],
            max_tokens: 5000,
        };

        assert_eq!(client("gpt-4o", 1000).build_request_body(&request)["max_tokens"], 1000);
        assert_eq!(
            client("o3-mini", 1000).build_request_body(&request)["max_completion_tokens"],
            1000
        );
    }

    #[test]
    fn test_parse_response() {
        let api: OpenAIResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"ddl\":[]}"}}],
                "usage":{"prompt_tokens":12,"completion_tokens":3,"total_tokens":15}}"#,
        )
        .unwrap();
        let response = client("gpt-4o", 100).parse_response(api);
        assert_eq!(response.content.as_deref(), Some("{\"ddl\":[]}"));
        assert_eq!(response.usage.input_tokens, 12);
        assert_eq!(response.usage.output_tokens, 3);
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = LlmConfig {
            provider: "openai".to_string(),
            api_key_env: "LAKEPLAN_TEST_UNSET_OPENAI_KEY".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(OpenAIClient::from_config(&config), Err(LlmError::Config(_))));
    }
}
