//! LLM integration for email triage.
//!
//! Supports:
//! - **Ollama**: local models over `/api/chat`
//! - **OpenAI**: any OpenAI-compatible chat completions endpoint
//!
//! Both backends implement `LlmProvider`; the triage workflow only ever sees
//! them through `pipeline::oracle::LlmOracle`.

pub mod ollama;
pub mod openai;
pub mod provider;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::*;

use std::sync::Arc;

use secrecy::SecretString;

use crate::error::{ConfigError, LlmError};

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Ollama,
    OpenAi,
}

impl std::str::FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Err(ConfigError::InvalidValue {
                key: "EMAIL_TRIAGE_BACKEND".to_string(),
                message: format!("unknown backend '{other}' (expected ollama or openai)"),
            }),
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Ollama,
            base_url: ollama::DEFAULT_OLLAMA_URL.to_string(),
            api_key: None,
            model: "qwen2.5:latest".to_string(),
        }
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> crate::error::Result<Arc<dyn LlmProvider>> {
    match config.backend {
        LlmBackend::Ollama => {
            tracing::info!("Using Ollama (model: {}, url: {})", config.model, config.base_url);
            Ok(Arc::new(OllamaProvider::new(&config.base_url, &config.model)))
        }
        LlmBackend::OpenAi => {
            let api_key = config.api_key.clone().ok_or_else(|| LlmError::AuthFailed {
                provider: "openai".to_string(),
            })?;
            tracing::info!("Using OpenAI-compatible API (model: {})", config.model);
            Ok(Arc::new(OpenAiProvider::new(
                &config.base_url,
                api_key,
                &config.model,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_provider() {
        let provider = create_provider(&LlmConfig::default()).unwrap();
        assert_eq!(provider.model_name(), "qwen2.5:latest");
    }

    #[test]
    fn test_create_openai_provider() {
        let config = LlmConfig {
            backend: LlmBackend::OpenAi,
            base_url: openai::DEFAULT_OPENAI_URL.to_string(),
            api_key: Some(SecretString::from("sk-test")),
            model: "gpt-4o".to_string(),
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "gpt-4o");
    }

    #[test]
    fn test_openai_without_key_fails() {
        let config = LlmConfig {
            backend: LlmBackend::OpenAi,
            api_key: None,
            ..LlmConfig::default()
        };
        assert!(matches!(
            create_provider(&config),
            Err(crate::error::Error::Llm(LlmError::AuthFailed { .. }))
        ));
    }

    #[test]
    fn backend_parsing() {
        assert_eq!("ollama".parse::<LlmBackend>().unwrap(), LlmBackend::Ollama);
        assert_eq!(" OpenAI ".parse::<LlmBackend>().unwrap(), LlmBackend::OpenAi);
        assert!("anthropic".parse::<LlmBackend>().is_err());
    }
}
