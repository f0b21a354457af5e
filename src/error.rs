//! Error types for email triage.

use std::time::Duration;

use uuid::Uuid;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Triage error: {0}")]
    Triage(#[from] TriageError),

    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} returned status {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} timed out")]
    Timeout { provider: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of the text-completion oracle.
///
/// Every variant is fatal for the email currently being triaged.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Oracle unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Oracle timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Oracle prompt must not be empty")]
    EmptyPrompt,
}

impl From<LlmError> for OracleError {
    fn from(e: LlmError) -> Self {
        match e {
            // Provider-side timeouts carry no bound of their own.
            LlmError::Timeout { .. } => OracleError::Timeout {
                timeout: Duration::ZERO,
            },
            other => OracleError::Unavailable {
                reason: other.to_string(),
            },
        }
    }
}

/// Workflow step that was running when a triage run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageStep {
    Classify,
    Draft,
}

impl std::fmt::Display for TriageStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classify => f.write_str("classify"),
            Self::Draft => f.write_str("draft"),
        }
    }
}

/// Errors that abort a single email's triage run.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("Malformed email ({sender}, {subject:?}): {field} is missing")]
    MalformedEmail {
        field: &'static str,
        sender: String,
        subject: String,
    },

    #[error("Run {run_id} ({sender}, {subject:?}) failed at {step}: {source}")]
    Oracle {
        run_id: Uuid,
        sender: String,
        subject: String,
        step: TriageStep,
        #[source]
        source: OracleError,
    },
}

impl TriageError {
    /// The underlying oracle failure, if any.
    pub fn oracle_error(&self) -> Option<&OracleError> {
        match self {
            Self::Oracle { source, .. } => Some(source),
            Self::MalformedEmail { .. } => None,
        }
    }

    /// Which step failed, if the failure came from the oracle.
    pub fn step(&self) -> Option<TriageStep> {
        match self {
            Self::Oracle { step, .. } => Some(*step),
            Self::MalformedEmail { .. } => None,
        }
    }
}

/// Errors loading emails from files.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Failed to parse RFC 822 message: {0}")]
    InvalidMessage(String),

    #[error("Unsupported email file type: {0}")]
    UnsupportedFormat(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_timeout_maps_to_oracle_timeout() {
        let err: OracleError = LlmError::Timeout {
            provider: "ollama".into(),
        }
        .into();
        assert!(matches!(err, OracleError::Timeout { .. }));
    }

    #[test]
    fn llm_api_error_maps_to_unavailable() {
        let err: OracleError = LlmError::Api {
            provider: "ollama".into(),
            status: 503,
            message: "loading model".into(),
        }
        .into();
        match err {
            OracleError::Unavailable { reason } => {
                assert!(reason.contains("503"));
                assert!(reason.contains("loading model"));
            }
            other => panic!("Expected Unavailable, got {:?}", other),
        }
    }

    #[test]
    fn triage_error_exposes_step_and_source() {
        let err = TriageError::Oracle {
            run_id: Uuid::nil(),
            sender: "a@b.com".into(),
            subject: "Hi".into(),
            step: TriageStep::Draft,
            source: OracleError::Timeout {
                timeout: Duration::from_secs(5),
            },
        };
        assert_eq!(err.step(), Some(TriageStep::Draft));
        assert!(matches!(
            err.oracle_error(),
            Some(OracleError::Timeout { .. })
        ));
        let msg = err.to_string();
        assert!(msg.contains("a@b.com"));
        assert!(msg.contains("draft"));
    }

    #[test]
    fn malformed_email_has_no_step() {
        let err = TriageError::MalformedEmail {
            field: "body",
            sender: "a@b.com".into(),
            subject: "Hi".into(),
        };
        assert!(err.step().is_none());
        assert_eq!(
            err.to_string(),
            "Malformed email (a@b.com, \"Hi\"): body is missing"
        );
    }

    #[test]
    fn module_errors_convert_to_crate_error() {
        let err: Error = ConfigError::MissingEnvVar("OPENAI_API_KEY".into()).into();
        assert!(matches!(err, Error::Config(ConfigError::MissingEnvVar(_))));
        assert!(err.to_string().starts_with("Configuration error:"));

        let err: Error = LlmError::AuthFailed {
            provider: "openai".into(),
        }
        .into();
        assert!(matches!(err, Error::Llm(LlmError::AuthFailed { .. })));

        let err: Error = IntakeError::UnsupportedFormat("txt".into()).into();
        assert!(matches!(err, Error::Intake(IntakeError::UnsupportedFormat(_))));
    }
}
