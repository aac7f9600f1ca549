use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use service_core::error::AppError;

use crate::config::InstructionSource;
use crate::services::metrics;
use crate::startup::AppState;

const MISSING_TEXT: &str = "No text provided";
const MISSING_TEXT_OR_PROMPT: &str = "No text / system prompt provided";

/// Inputs of an `/ai` call, taken from the query string (GET) or JSON body (POST).
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AiRequest {
    pub text: Option<String>,
    pub system_prompt: Option<String>,
}

impl AiRequest {
    /// The last occurrence of a repeated key wins.
    pub fn from_query(pairs: Vec<(String, String)>) -> Self {
        let mut request = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "text" => request.text = Some(value),
                "system_prompt" => request.system_prompt = Some(value),
                _ => {}
            }
        }
        request
    }

    /// Falsy JSON (`null`, `false`, `0`, `""`, `[]`, `{}`) counts as absent, both for
    /// the whole body and for a single field. Any other non-object body, or a
    /// used field holding a non-string, is an error. `system_prompt` is only
    /// read when `wants_prompt` is set.
    pub fn from_body(body: &[u8], wants_prompt: bool) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_slice(body)?;
        if is_falsy(&value) {
            return Ok(Self::default());
        }

        let fields = match value {
            Value::Object(fields) => fields,
            other => anyhow::bail!(
                "Request body must be a JSON object, got {}",
                json_kind(&other)
            ),
        };

        let text = string_field(&fields, "text")?;
        let system_prompt = if wants_prompt {
            string_field(&fields, "system_prompt")?
        } else {
            None
        };

        Ok(Self {
            text,
            system_prompt,
        })
    }
}

fn string_field(fields: &Map<String, Value>, name: &str) -> anyhow::Result<Option<String>> {
    match fields.get(name) {
        None => Ok(None),
        Some(value) if is_falsy(value) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => anyhow::bail!("Field '{}' must be a string, got {}", name, json_kind(other)),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Serialize)]
pub struct AiResponse {
    pub user: String,
    pub response: String,
    pub credit: String,
}

#[tracing::instrument(skip_all)]
pub async fn ai_query(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<AiResponse>, AppError> {
    let result = match query {
        Ok(Query(pairs)) => relay(&state, AiRequest::from_query(pairs)).await,
        Err(rejection) => Err(state.config.relay.unhandled(rejection.body_text())),
    };
    record_outcome("GET", &result);
    result
}

/// The body is parsed by hand so that a missing or foreign `Content-Type`
/// is not itself an error.
#[tracing::instrument(skip_all)]
pub async fn ai_body(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AiResponse>, AppError> {
    let wants_prompt = matches!(state.config.relay.instruction, InstructionSource::PerRequest);
    let result = match AiRequest::from_body(&body, wants_prompt) {
        Ok(request) => relay(&state, request).await,
        Err(e) => Err(state.config.relay.unhandled(e)),
    };
    record_outcome("POST", &result);
    result
}

async fn relay(state: &AppState, request: AiRequest) -> Result<Json<AiResponse>, AppError> {
    let text = request.text.filter(|t| !t.is_empty());

    let (instruction, text) = match &state.config.relay.instruction {
        InstructionSource::Fixed(instruction) => {
            let text = text.ok_or_else(|| AppError::BadRequest(anyhow::anyhow!(MISSING_TEXT)))?;
            (instruction.clone(), text)
        }
        InstructionSource::PerRequest => {
            match (text, request.system_prompt.filter(|p| !p.is_empty())) {
                (Some(text), Some(prompt)) => (prompt, text),
                _ => {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        MISSING_TEXT_OR_PROMPT
                    )))
                }
            }
        }
    };

    tracing::info!(text_len = text.len(), "Relaying query to backend");

    let reply = state
        .responder
        .respond(&instruction, &text)
        .await
        .map_err(|e| state.config.relay.unhandled(e))?;

    Ok(Json(AiResponse {
        user: text,
        response: reply,
        credit: state.config.relay.credit.clone(),
    }))
}

fn record_outcome(method: &str, result: &Result<Json<AiResponse>, AppError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(AppError::BadRequest(_)) => "bad_request",
        Err(_) => "error",
    };
    metrics::record_relay_request(method, outcome);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn query_takes_last_repeated_value() {
        let request = AiRequest::from_query(pairs(&[("text", "a"), ("other", "x"), ("text", "b")]));
        assert_eq!(request.text.as_deref(), Some("b"));
        assert_eq!(request.system_prompt, None);
    }

    #[test]
    fn falsy_bodies_are_empty_requests() {
        for body in ["null", "false", "0", "0.0", "\"\"", "[]", "{}"] {
            let request = AiRequest::from_body(body.as_bytes(), true).unwrap();
            assert_eq!(request, AiRequest::default(), "body {body}");
        }
    }

    #[test]
    fn truthy_non_object_bodies_are_rejected() {
        for body in [r#"["hi", null]"#, "\"hi\"", "1", "true"] {
            let err = AiRequest::from_body(body.as_bytes(), false).unwrap_err();
            assert!(
                err.to_string().starts_with("Request body must be a JSON object"),
                "body {body}: {err}"
            );
        }
    }

    #[test]
    fn falsy_fields_count_as_absent() {
        let request =
            AiRequest::from_body(br#"{"text": 0, "system_prompt": false}"#, true).unwrap();
        assert_eq!(request, AiRequest::default());
    }

    #[test]
    fn non_string_text_is_rejected() {
        let err = AiRequest::from_body(br#"{"text": 5}"#, false).unwrap_err();
        assert_eq!(err.to_string(), "Field 'text' must be a string, got number");
    }

    #[test]
    fn system_prompt_is_not_read_unless_wanted() {
        let request = AiRequest::from_body(br#"{"text": "hi", "system_prompt": 5}"#, false).unwrap();
        assert_eq!(request.text.as_deref(), Some("hi"));
        assert_eq!(request.system_prompt, None);

        assert!(AiRequest::from_body(br#"{"text": "hi", "system_prompt": 5}"#, true).is_err());
    }
}
