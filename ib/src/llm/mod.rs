//! Text-generation provider clients
//!
//! One trait, two HTTP implementations, and the `stub` provider which
//! disables generation entirely.

use std::sync::Arc;

use tracing::debug;

mod anthropic;
pub mod client;
mod error;
mod openai;
mod retry;
mod types;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use retry::RetryPolicy;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

use crate::config::LlmConfig;

/// Create an LLM client based on the provider specified in config
///
/// Returns `None` for "stub" or "none": the pipeline then always falls back.
pub fn create_client(config: &LlmConfig) -> Result<Option<Arc<dyn LlmClient>>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "stub" | "none" => {
            debug!("create_client: generation disabled");
            Ok(None)
        }
        "anthropic" => {
            debug!("create_client: creating Anthropic client");
            Ok(Some(Arc::new(AnthropicClient::from_config(config)?)))
        }
        "openai" => {
            debug!("create_client: creating OpenAI client");
            Ok(Some(Arc::new(OpenAIClient::from_config(config)?)))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::UnknownProvider(other.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_stub_is_none() {
        let config = LlmConfig::default();
        assert!(create_client(&config).unwrap().is_none());
    }

    #[test]
    fn test_create_client_openai() {
        let config = LlmConfig {
            provider: "openai".to_string(),
            model: "gpt-oss-20b".to_string(),
            ..LlmConfig::default()
        };
        let client = create_client(&config).unwrap().unwrap();
        assert_eq!(client.model(), "gpt-oss-20b");
    }

    #[test]
    fn test_create_client_unknown_provider() {
        let config = LlmConfig {
            provider: "markov".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(create_client(&config), Err(LlmError::UnknownProvider(p)) if p == "markov"));
    }
}
