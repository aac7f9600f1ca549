//! Mock provider for tests and local runs without a backend credential.

use super::{FinishReason, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

enum Behaviour {
    Echo,
    Reply(String),
    Fail(String),
}

/// Mock text provider.
///
/// Records every prompt it receives so callers can assert on what was sent,
/// or that nothing was sent at all.
pub struct MockTextProvider {
    behaviour: Behaviour,
    prompts: Mutex<Vec<String>>,
}

impl MockTextProvider {
    /// Answers `Mock response for: <prompt>`.
    pub fn new() -> Self {
        Self::with(Behaviour::Echo)
    }

    /// Always answers with `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self::with(Behaviour::Reply(reply.into()))
    }

    /// Always fails with an API error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with(Behaviour::Fail(message.into()))
    }

    fn with(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockTextProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(&self, prompt: &str) -> Result<ProviderResponse, ProviderError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        let text = match &self.behaviour {
            Behaviour::Echo => format!("Mock response for: {}", prompt),
            Behaviour::Reply(reply) => reply.clone(),
            Behaviour::Fail(message) => return Err(ProviderError::ApiError(message.clone())),
        };

        Ok(ProviderResponse {
            output_tokens: text.len() as i32 / 4,
            text: Some(text),
            input_tokens: prompt.len() as i32 / 4,
            finish_reason: FinishReason::Complete,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }
}
