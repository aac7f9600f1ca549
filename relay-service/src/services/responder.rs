use crate::services::metrics;
use crate::services::providers::{ProviderError, TextProvider};
use std::sync::Arc;
use std::time::Instant;

/// Join an instruction preamble and a user query into one backend prompt.
pub fn build_prompt(instruction: &str, user_text: &str) -> String {
    format!("{}\n\nUser: {}", instruction, user_text)
}

/// Turns (instruction, user text) into a generated reply.
#[derive(Clone)]
pub struct Responder {
    provider: Arc<dyn TextProvider>,
}

impl Responder {
    pub fn new(provider: Arc<dyn TextProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Ask the backend once and return its text verbatim.
    ///
    /// Backend errors are returned unchanged; there is no retry.
    #[tracing::instrument(skip_all, fields(provider = self.provider.name(), model = self.provider.model()))]
    pub async fn respond(&self, instruction: &str, user_text: &str) -> Result<String, ProviderError> {
        let prompt = build_prompt(instruction, user_text);
        let (name, model) = (self.provider.name(), self.provider.model());

        let start = Instant::now();
        let result = self.provider.generate(&prompt).await;
        metrics::record_provider_latency(name, model, start.elapsed().as_secs_f64());

        let outcome = result.and_then(|response| {
            metrics::record_tokens(model, response.input_tokens, response.output_tokens);
            tracing::debug!(
                input_tokens = response.input_tokens,
                output_tokens = response.output_tokens,
                finish_reason = ?response.finish_reason,
                "Backend call completed"
            );
            response.text.ok_or(ProviderError::EmptyResponse)
        });

        if let Err(e) = &outcome {
            metrics::record_provider_error(name, e.kind());
            tracing::warn!(error = %e, "Backend call failed");
        }

        outcome
    }
}
