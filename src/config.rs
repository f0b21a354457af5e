//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig, ollama, openai};
use crate::pipeline::workflow::DEFAULT_BATCH_CONCURRENCY;

/// Triage workflow configuration.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Which model backend answers classification and drafting prompts.
    pub llm: LlmConfig,
    /// Sampling temperature. Zero approximates deterministic output.
    pub temperature: f32,
    /// Max tokens per oracle response.
    pub max_tokens: u32,
    /// Upper bound on a single oracle call.
    pub oracle_timeout: Duration,
    /// Emails triaged concurrently by `run_batch`.
    pub concurrency: usize,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            temperature: 0.0,
            max_tokens: 1024,
            oracle_timeout: Duration::from_secs(120), // 2 minutes
            concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }
}

impl TriageConfig {
    /// Build config from environment variables.
    pub fn from_env() -> crate::error::Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok())?)
    }

    /// Build config from an arbitrary key lookup (environment, test map, ...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let backend: LlmBackend = match lookup("EMAIL_TRIAGE_BACKEND") {
            Some(s) => s.parse()?,
            None => LlmBackend::Ollama,
        };

        let model = lookup("EMAIL_TRIAGE_MODEL").unwrap_or_else(|| match backend {
            LlmBackend::Ollama => defaults.llm.model.clone(),
            LlmBackend::OpenAi => "gpt-4o-mini".to_string(),
        });

        let base_url = lookup("EMAIL_TRIAGE_BASE_URL").unwrap_or_else(|| match backend {
            LlmBackend::Ollama => ollama::DEFAULT_OLLAMA_URL.to_string(),
            LlmBackend::OpenAi => openai::DEFAULT_OPENAI_URL.to_string(),
        });

        let api_key = lookup("EMAIL_TRIAGE_API_KEY")
            .or_else(|| lookup("OPENAI_API_KEY"))
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);

        if backend == LlmBackend::OpenAi && api_key.is_none() {
            return Err(ConfigError::MissingEnvVar("EMAIL_TRIAGE_API_KEY".to_string()));
        }

        let temperature = parse_or(&lookup, "EMAIL_TRIAGE_TEMPERATURE", defaults.temperature)?;
        let max_tokens = parse_or(&lookup, "EMAIL_TRIAGE_MAX_TOKENS", defaults.max_tokens)?;
        let timeout_secs = parse_or(
            &lookup,
            "EMAIL_TRIAGE_TIMEOUT_SECS",
            defaults.oracle_timeout.as_secs(),
        )?;
        let concurrency = parse_or(&lookup, "EMAIL_TRIAGE_CONCURRENCY", defaults.concurrency)?;

        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "EMAIL_TRIAGE_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            llm: LlmConfig {
                backend,
                base_url,
                api_key,
                model,
            },
            temperature,
            max_tokens,
            oracle_timeout: Duration::from_secs(timeout_secs),
            concurrency: concurrency.max(1),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
