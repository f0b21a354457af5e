//! The oracle boundary: `invoke(prompt) -> text`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::TriageConfig;
use crate::error::OracleError;
use crate::llm::{ChatMessage, CompletionRequest, FinishReason, LlmProvider};

/// A text-completion service answering triage prompts.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Answer `prompt`. Empty prompts are rejected.
    async fn invoke(&self, prompt: &str) -> Result<String, OracleError>;
}

/// Oracle backed by an `LlmProvider`, with a bounded wait per call.
pub struct LlmOracle {
    llm: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl LlmOracle {
    pub fn new(llm: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self {
            llm,
            temperature: 0.0,
            max_tokens: 1024,
            timeout,
        }
    }

    /// Build from triage configuration.
    pub fn from_config(llm: Arc<dyn LlmProvider>, config: &TriageConfig) -> Self {
        Self::new(llm, config.oracle_timeout)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn invoke(&self, prompt: &str) -> Result<String, OracleError> {
        if prompt.trim().is_empty() {
            return Err(OracleError::EmptyPrompt);
        }

        let request = CompletionRequest::new(vec![ChatMessage::user(prompt)])
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = match tokio::time::timeout(self.timeout, self.llm.complete(request)).await {
            Ok(result) => result.map_err(|e| {
                warn!(model = self.llm.model_name(), error = %e, "Oracle call failed");
                match OracleError::from(e) {
                    OracleError::Timeout { .. } => OracleError::Timeout {
                        timeout: self.timeout,
                    },
                    other => other,
                }
            })?,
            Err(_) => {
                warn!(
                    model = self.llm.model_name(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Oracle call timed out"
                );
                return Err(OracleError::Timeout {
                    timeout: self.timeout,
                });
            }
        };

        debug!(
            model = self.llm.model_name(),
            response_id = response.response_id.as_deref().unwrap_or("-"),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Oracle responded"
        );
        // A cut-off answer is still parsed as-is.
        if response.finish_reason == FinishReason::Length {
            warn!(
                model = self.llm.model_name(),
                max_tokens = self.max_tokens,
                "Oracle response truncated at token limit"
            );
        }

        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::error::LlmError;
    use crate::llm::CompletionResponse;

    /// Mock LLM returning a fixed response and recording requests.
    struct MockLlm {
        response: Result<String, fn() -> LlmError>,
        finish_reason: FinishReason,
        delay: Duration,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlm {
        fn ok(text: &str) -> Self {
            Self {
                response: Ok(text.to_string()),
                finish_reason: FinishReason::Stop,
                delay: Duration::ZERO,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(make: fn() -> LlmError) -> Self {
            Self {
                response: Err(make),
                ..Self::ok("")
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn model_name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.response {
                Ok(text) => Ok(CompletionResponse {
                    content: text.clone(),
                    input_tokens: 10,
                    output_tokens: 5,
                    finish_reason: self.finish_reason,
                    response_id: Some("resp-1".into()),
                }),
                Err(make) => Err(make()),
            }
        }
    }

    #[tokio::test]
    async fn returns_response_content() {
        let llm = Arc::new(MockLlm::ok("LEGITIMATE inquiry"));
        let oracle = LlmOracle::new(llm.clone(), Duration::from_secs(5)).with_max_tokens(64);

        let out = oracle.invoke("classify me").await.unwrap();
        assert_eq!(out, "LEGITIMATE inquiry");

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[0].messages[0].content, "classify me");
        assert_eq!(requests[0].temperature, Some(0.0));
        assert_eq!(requests[0].max_tokens, Some(64));
    }

    #[tokio::test]
    async fn truncated_response_is_still_returned() {
        let llm = Arc::new(MockLlm {
            finish_reason: FinishReason::Length,
            ..MockLlm::ok("Dear John, thank you for")
        });
        let oracle = LlmOracle::new(llm, Duration::from_secs(5)).with_max_tokens(8);

        let out = oracle.invoke("draft a reply").await.unwrap();
        assert_eq!(out, "Dear John, thank you for");
    }

    #[tokio::test]
    async fn empty_prompt_never_reaches_provider() {
        let llm = Arc::new(MockLlm::ok("x"));
        let oracle = LlmOracle::new(llm.clone(), Duration::from_secs(5));

        let err = oracle.invoke("   ").await.unwrap_err();
        assert!(matches!(err, OracleError::EmptyPrompt));
        assert!(llm.requests.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let llm = Arc::new(MockLlm {
            delay: Duration::from_secs(60),
            ..MockLlm::ok("too late")
        });
        let oracle = LlmOracle::new(llm, Duration::from_secs(2));

        match oracle.invoke("hello").await {
            Err(OracleError::Timeout { timeout }) => assert_eq!(timeout, Duration::from_secs(2)),
            other => panic!("Expected Timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn provider_failure_is_unavailable() {
        let llm = Arc::new(MockLlm::failing(|| LlmError::RequestFailed {
            provider: "mock".into(),
            reason: "connection refused".into(),
        }));
        let oracle = LlmOracle::new(llm, Duration::from_secs(5));

        match oracle.invoke("hello").await {
            Err(OracleError::Unavailable { reason }) => assert!(reason.contains("connection refused")),
            other => panic!("Expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn provider_timeout_reports_configured_bound() {
        let llm = Arc::new(MockLlm::failing(|| LlmError::Timeout {
            provider: "mock".into(),
        }));
        let oracle = LlmOracle::new(llm, Duration::from_secs(7));

        match oracle.invoke("hello").await {
            Err(OracleError::Timeout { timeout }) => assert_eq!(timeout, Duration::from_secs(7)),
            other => panic!("Expected Timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn from_config_applies_sampling_options() {
        let llm = Arc::new(MockLlm::ok("ok"));
        let config = TriageConfig {
            temperature: 0.4,
            max_tokens: 99,
            ..TriageConfig::default()
        };
        let oracle = LlmOracle::from_config(llm.clone(), &config);
        oracle.invoke("p").await.unwrap();

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests[0].temperature, Some(0.4));
        assert_eq!(requests[0].max_tokens, Some(99));
    }
}
