//! Provider error types

use std::time::Duration;
use thiserror::Error;

/// Provider failures
///
/// The roadmap pipeline absorbs every one of these into its fallback; they
/// only reach the user through logs.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key: set the {0} environment variable")]
    MissingApiKey(String),

    #[error("Unknown LLM provider: '{0}'. Supported: stub, openai, anthropic")]
    UnknownProvider(String),

    #[error("Malformed provider body: {0}")]
    Json(#[from] serde_json::Error),
}
