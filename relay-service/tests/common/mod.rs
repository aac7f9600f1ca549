#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use relay_service::config::{
    GoogleConfig, InstructionSource, ModelConfig, ProviderKind, RelayConfig, RelaySettings,
    DEFAULT_API_BASE, DEFAULT_CREDIT, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEXT_MODEL,
};
use relay_service::services::providers::TextProvider;
use relay_service::startup::{build_router, AppState};
use secrecy::Secret;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use tower::ServiceExt;

pub fn config_with(instruction: InstructionSource) -> RelayConfig {
    RelayConfig {
        common: CoreConfig {
            port: 0,
            log_level: "info".to_string(),
        },
        google: GoogleConfig {
            api_key: Secret::new("test-api-key".to_string()),
            api_base: DEFAULT_API_BASE.to_string(),
        },
        models: ModelConfig {
            provider: ProviderKind::Mock,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            request_timeout_secs: None,
        },
        relay: RelaySettings {
            instruction,
            credit: DEFAULT_CREDIT.to_string(),
            expose_error_details: true,
        },
        otlp_endpoint: None,
    }
}

pub fn fixed_config() -> RelayConfig {
    config_with(InstructionSource::Fixed(DEFAULT_SYSTEM_PROMPT.to_string()))
}

pub fn per_request_config() -> RelayConfig {
    config_with(InstructionSource::PerRequest)
}

pub fn router(config: RelayConfig, provider: Arc<dyn TextProvider>) -> Router {
    build_router(AppState::new(config, provider))
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body is not UTF-8")
    }
}

pub async fn send(app: Router, request: Request<Body>) -> TestResponse {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();

    TestResponse {
        status,
        headers,
        body,
    }
}
