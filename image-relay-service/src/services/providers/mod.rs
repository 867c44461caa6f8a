//! Generative AI provider abstractions and implementations.
//!
//! Handlers only see the [`GenerativeProvider`] trait, so the Gemini backend
//! can be swapped for the scripted mock in tests and offline runs.

pub mod gemini;
pub mod mock;

use crate::models::{InlineImage, ModelResponse};
use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError { .. } => "api_error",
            ProviderError::InvalidResponse(_) => "invalid_response",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::ContentFiltered(_) => "content_filtered",
            ProviderError::NetworkError(_) => "network_error",
        }
    }
}

/// What the caller expects back from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Image generation; text may accompany the image.
    ImageAndText,
    /// Analysis; only text is expected.
    Text,
}

/// Trait for multimodal generation providers (e.g., Gemini).
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Provider name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Whether a credential is present. Says nothing about its validity.
    fn is_configured(&self) -> bool;

    /// Send the prompt followed by the image to `model`.
    async fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        image: &InlineImage,
        output: OutputKind,
    ) -> Result<ModelResponse, ProviderError>;
}
