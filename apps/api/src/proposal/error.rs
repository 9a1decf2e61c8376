//! Error taxonomy for proposal generation.

use thiserror::Error;

use crate::backoff::{Cancelled, Retryable};
use crate::llm_client::LlmError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("Please paste a job description to generate a proposal.")]
    InvalidInput,

    #[error("API key is missing. Set GEMINI_API_KEY in the service environment and restart.")]
    MissingCredential,

    #[error("API request failed: {}", transport_detail(.status, .message))]
    Transport { status: Option<u16>, message: String },

    #[error("API returned no text content or an empty response.")]
    EmptyResponse,

    #[error("API error: {0}")]
    EmbeddedService(String),

    #[error("Response did not match the proposal schema: {0}")]
    SchemaValidation(String),

    #[error("A proposal is already being generated")]
    Busy,

    #[error("Proposal generation was cancelled")]
    Cancelled,
}

fn transport_detail(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("{status} - {message}"),
        None => message.to_string(),
    }
}

impl GenerationError {
    /// Stable machine-readable code, used in API envelopes and lifecycle events.
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::InvalidInput => "INVALID_INPUT",
            GenerationError::MissingCredential => "MISSING_CREDENTIAL",
            GenerationError::Transport { .. } => "TRANSPORT_ERROR",
            GenerationError::EmptyResponse => "EMPTY_RESPONSE",
            GenerationError::EmbeddedService(_) => "EMBEDDED_SERVICE_ERROR",
            GenerationError::SchemaValidation(_) => "SCHEMA_VALIDATION_ERROR",
            GenerationError::Busy => "BUSY",
            GenerationError::Cancelled => "CANCELLED",
        }
    }
}

/// Only transport failures and empty responses are worth another attempt.
impl Retryable for GenerationError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Transport { .. } | GenerationError::EmptyResponse
        )
    }
}

impl From<Cancelled> for GenerationError {
    fn from(_: Cancelled) -> Self {
        GenerationError::Cancelled
    }
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Http(e) => GenerationError::Transport {
                status: e.status().map(|s| s.as_u16()),
                message: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                },
            },
            LlmError::Api { status, message } => GenerationError::Transport {
                status: Some(status),
                message,
            },
            LlmError::EmptyContent => GenerationError::EmptyResponse,
        }
    }
}
