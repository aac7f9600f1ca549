//! Non-relay routes: placeholder page, health, metrics, fallback and CORS.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{fixed_config, get, router, send};
use relay_service::services::metrics::init_metrics;
use relay_service::services::providers::mock::MockTextProvider;
use std::sync::Arc;

fn app() -> axum::Router {
    router(fixed_config(), Arc::new(MockTextProvider::new()))
}

#[tokio::test]
async fn home_returns_placeholder_html() {
    let response = send(app(), get("/")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "HelloWorld('Print')");
    let content_type = response.headers.get(header::CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/html"));
}

#[tokio::test]
async fn health_check_returns_ok() {
    let provider = Arc::new(MockTextProvider::new());
    let response = send(router(fixed_config(), provider.clone()), get("/health")).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "relay-service");
    assert!(provider.prompts().is_empty());
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let response = send(app(), get("/nope")).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], "Not found");
}

#[tokio::test]
async fn metrics_expose_relay_counters() {
    init_metrics().unwrap();

    let _ = send(app(), get("/ai?text=hello")).await;
    let response = send(app(), get("/metrics")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("relay_requests_total"));
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let response = send(app(), get("/")).await;

    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn cors_mirrors_origin_and_allows_credentials() {
    let request = Request::builder()
        .uri("/ai?text=hi")
        .header(header::ORIGIN, "https://canopy.example")
        .body(Body::empty())
        .unwrap();

    let response = send(app(), request).await;

    assert_eq!(
        response.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://canopy.example"
    );
    assert_eq!(
        response
            .headers
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}

#[tokio::test]
async fn cors_preflight_allows_any_method_and_header() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/ai")
        .header(header::ORIGIN, "https://elsewhere.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-custom-header")
        .body(Body::empty())
        .unwrap();

    let response = send(app(), request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://elsewhere.example"
    );
    assert_eq!(
        response.headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
        "POST"
    );
    assert_eq!(
        response.headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
        "x-custom-header"
    );
}
