//! Ollama backend using the non-streaming `/api/chat` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider};

const PROVIDER: &str = "ollama";

/// Default Ollama server address.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama LLM provider.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    /// Create a provider for `model` on the server at `base_url`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn build_request<'a>(&'a self, request: &'a CompletionRequest) -> OllamaChatRequest<'a> {
        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: request.temperature,
                // -1 means unlimited to Ollama, so saturate instead of wrapping
                num_predict: request
                    .max_tokens
                    .map(|n| i32::try_from(n).unwrap_or(i32::MAX)),
            })
        } else {
            None
        };

        OllamaChatRequest {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            options,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.build_request(&request);

        debug!(
            model = %self.model,
            message_count = request.messages.len(),
            "Sending completion request to Ollama"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        provider: PROVIDER.to_string(),
                    }
                } else {
                    LlmError::RequestFailed {
                        provider: PROVIDER.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: PROVIDER.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let parsed: OllamaChatResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    reason: format!("Failed to parse Ollama response: {e}"),
                })?;

        Ok(parsed.into_completion())
    }
}

// ── Ollama API types ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaChatResponse {
    fn into_completion(self) -> CompletionResponse {
        let finish_reason = match self.done_reason.as_deref() {
            Some("stop") | None => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some(_) => FinishReason::Unknown,
        };
        CompletionResponse {
            content: self.message.content,
            input_tokens: self.prompt_eval_count.unwrap_or(0),
            output_tokens: self.eval_count.unwrap_or(0),
            finish_reason,
            response_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let provider = OllamaProvider::new("http://localhost:11434/", "qwen2.5:latest");
        let request = CompletionRequest::new(vec![ChatMessage::user("classify this")])
            .with_temperature(0.0)
            .with_max_tokens(256);
        let json = serde_json::to_value(provider.build_request(&request)).unwrap();

        assert_eq!(json["model"], "qwen2.5:latest");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "classify this");
        assert_eq!(json["options"]["temperature"], 0.0);
        assert_eq!(json["options"]["num_predict"], 256);
    }

    #[test]
    fn oversized_token_limit_saturates() {
        let provider = OllamaProvider::new(DEFAULT_OLLAMA_URL, "llama3");
        let request =
            CompletionRequest::new(vec![ChatMessage::user("x")]).with_max_tokens(u32::MAX);
        let json = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert_eq!(json["options"]["num_predict"], i32::MAX);
    }

    #[test]
    fn request_without_options_omits_them() {
        let provider = OllamaProvider::new(DEFAULT_OLLAMA_URL, "llama3");
        let request = CompletionRequest::new(vec![ChatMessage::user("x")]);
        let json = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert!(json.get("options").is_none());
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider = OllamaProvider::new("http://host:11434/", "m");
        assert_eq!(provider.base_url, "http://host:11434");
        assert_eq!(provider.model_name(), "m");
    }

    #[test]
    fn response_parsing() {
        let raw = r#"{"model":"qwen2.5","message":{"role":"assistant","content":"LEGITIMATE inquiry"},"done":true,"done_reason":"stop","prompt_eval_count":42,"eval_count":7}"#;
        let parsed: OllamaChatResponse = serde_json::from_str(raw).unwrap();
        let completion = parsed.into_completion();
        assert_eq!(completion.content, "LEGITIMATE inquiry");
        assert_eq!(completion.input_tokens, 42);
        assert_eq!(completion.output_tokens, 7);
        assert_eq!(completion.finish_reason, FinishReason::Stop);
    }

    #[test]
    fn response_length_finish_reason() {
        let raw = r#"{"message":{"content":"trunc"},"done_reason":"length"}"#;
        let parsed: OllamaChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.into_completion().finish_reason, FinishReason::Length);
    }

    #[tokio::test]
    async fn unreachable_server_is_request_failure() {
        let provider = OllamaProvider::new("http://127.0.0.1:1", "m");
        let err = provider
            .complete(CompletionRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LlmError::RequestFailed { .. } | LlmError::Timeout { .. }
        ));
    }
}
