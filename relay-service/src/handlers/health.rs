use axum::{response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "relay-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Not found"))
}
