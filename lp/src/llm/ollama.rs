//! Ollama client
//!
//! Uses the non-streaming `/api/generate` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::retry::{INITIAL_BACKOFF_MS, MAX_RETRIES, is_retryable_status, retry_after};
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, TokenUsage};
use crate::config::LlmConfig;

/// Client for a local or remote Ollama server
pub struct OllamaClient {
    model: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl OllamaClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, "OllamaClient::from_config: called");
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            base_url: config.resolved_base_url(),
            http,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout(),
        })
    }

    /// `/api/generate` takes one prompt; user messages are joined in order
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let prompt = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        serde_json::json!({
            "model": self.model,
            "system": request.system_prompt,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": request.max_tokens.min(self.max_tokens),
            },
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, "OllamaClient::complete: called");
        let url = format!("{}/api/generate", self.base_url);
        let body = self.build_request_body(&request);

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "OllamaClient::complete: retrying");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self.http.post(url.clone()).json(&body).send().await {
                Ok(r) => r,
                Err(e) if e.is_timeout() => return Err(LlmError::Timeout(self.timeout)),
                Err(e) => {
                    debug!(attempt, error = %e, "OllamaClient::complete: network error");
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();
            if status == 429 {
                return Err(LlmError::RateLimited {
                    retry_after: retry_after(&response),
                });
            }
            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                last_error = Some(LlmError::ApiError { status, message: text });
                continue;
            }
            if !response.status().is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::ApiError { status, message: text });
            }

            let generated: GenerateResponse = response.json().await?;
            debug!(done = generated.done, "OllamaClient::complete: success");
            return Ok(CompletionResponse {
                content: Some(generated.response),
                usage: TokenUsage {
                    input_tokens: generated.prompt_eval_count.unwrap_or(0),
                    output_tokens: generated.eval_count.unwrap_or(0),
                },
            });
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
    }

    fn provider(&self) -> &str {
        "ollama"
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    done: bool,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}
