//! Generative-language provider abstraction.
//!
//! The resolver only needs two operations from a provider: list the models
//! that can generate content, and generate content with a named model.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// The provider answered with a non-success HTTP status.
    #[error("Gemini API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A well-formed response with no text, e.g. a blocked prompt.
    #[error("Empty response: {0}")]
    EmptyResponse(String),
}

impl ProviderError {
    /// HTTP status reported by the provider, if the failure came with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A generative-language backend.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Identifiers (without the `models/` prefix) of models supporting content
    /// generation, in provider order.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError>;

    /// Generate text with `model` given `prompt` as the sole input.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError>;
}
