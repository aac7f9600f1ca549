//! Generative-text backends.
//!
//! The relay only needs one capability from a backend: turn a prompt into
//! text. [`TextProvider`] captures that so the Gemini client can be swapped
//! for a mock in tests and local runs.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
///
/// The `Display` text is what callers see in the `500` envelope.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Response contained no text")]
    EmptyResponse,
}

impl ProviderError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::ContentFiltered => "content_filtered",
            ProviderError::NetworkError(_) => "network_error",
            ProviderError::EmptyResponse => "empty_response",
        }
    }
}

/// Result of a provider call.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Generated text, `None` when the backend produced no text part.
    pub text: Option<String>,

    /// Input tokens consumed.
    pub input_tokens: i32,

    /// Output tokens generated.
    pub output_tokens: i32,

    pub finish_reason: FinishReason,
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
    Other,
}

impl FinishReason {
    pub fn from_api(reason: Option<&str>) -> Self {
        match reason {
            None | Some("STOP") => FinishReason::Complete,
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("PROHIBITED_CONTENT") | Some("BLOCKLIST") | Some("SPII") => {
                FinishReason::ContentFilter
            }
            Some(_) => FinishReason::Other,
        }
    }
}

/// Trait for text generation backends (e.g., Gemini).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Generate a reply for a single prompt.
    async fn generate(&self, prompt: &str) -> Result<ProviderResponse, ProviderError>;

    /// Provider name used in logs and metric labels.
    fn name(&self) -> &str;

    /// Model handle the provider talks to.
    fn model(&self) -> &str;
}
