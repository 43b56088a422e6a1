//! Ollama backend.
//!
//! Talks to a local Ollama server (typically `http://localhost:11434`)
//! through its non-streaming `/api/generate` endpoint.

use crate::backend::{
    LlmBackend, LlmBackendConfig, LlmProvider, LlmRequest, LlmResponse, TokenUsage,
};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// LLM backend for an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    base_url: String,
    model: String,
    max_tokens: Option<u32>,
    client: Client,
}

impl OllamaBackend {
    /// Creates a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidConfig`] if the base URL is not HTTP(S),
    /// the model is blank, the timeout is zero, or the HTTP client cannot
    /// be built.
    pub fn new(config: &LlmBackendConfig) -> Result<Self, LlmError> {
        let invalid = |reason: String| {
            warn!(%reason, "rejecting Ollama configuration");
            LlmError::InvalidConfig { reason }
        };

        let base_url = config.base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(invalid(format!(
                "base URL '{}' must start with http:// or https://",
                config.base_url
            )));
        }
        if config.model.trim().is_empty() {
            return Err(invalid("model must not be empty".to_string()));
        }
        if config.timeout_secs == 0 {
            return Err(invalid("timeout must be at least one second".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| invalid(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.to_string(),
            model: config.model.trim().to_string(),
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn build_body(&self, request: &LlmRequest) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: request.transcript(),
            system: request.system.clone(),
            format: request.output_schema.clone(),
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens.or(self.max_tokens),
            },
        }
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = self.build_body(request);
        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else if e.is_connect() {
                    LlmError::ProviderUnavailable {
                        provider: LlmProvider::Ollama.to_string(),
                        reason: format!("cannot connect to {}", self.base_url),
                    }
                } else {
                    LlmError::RequestFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited {
                retry_after_secs: None,
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                reason: format!("ollama returned {status}: {text}"),
            });
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            output_tokens = parsed.eval_count.unwrap_or_default(),
            "ollama response received"
        );

        let structured_output = if request.output_schema.is_some() {
            serde_json::from_str(&parsed.response).ok()
        } else {
            None
        };

        Ok(LlmResponse {
            content: parsed.response,
            structured_output,
            usage: TokenUsage {
                input_tokens: parsed.prompt_eval_count.unwrap_or_default(),
                output_tokens: parsed.eval_count.unwrap_or_default(),
            },
            model: parsed.model,
        })
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Ollama
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<JsonValue>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    model: String,
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}
