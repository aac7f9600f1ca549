//! Application startup and lifecycle management.

use crate::config::{InstructionSource, ProviderKind, RelayConfig};
use crate::handlers;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::mock::MockTextProvider;
use crate::services::providers::TextProvider;
use crate::services::Responder;
use axum::{middleware::from_fn, routing::get, Router};
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state. Immutable once built.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub responder: Responder,
}

impl AppState {
    pub fn new(config: RelayConfig, provider: Arc<dyn TextProvider>) -> Self {
        Self {
            config: Arc::new(config),
            responder: Responder::new(provider),
        }
    }
}

/// Any origin, method and header, with credentials.
///
/// A literal `*` is rejected alongside credentials, so the request's own
/// origin, method and headers are mirrored back instead.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/ai", get(handlers::ai_query).post(handlers::ai_body))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(cors_layer())
}

/// Build the backend selected by configuration.
pub fn build_provider(config: &RelayConfig) -> Result<Arc<dyn TextProvider>, AppError> {
    let provider: Arc<dyn TextProvider> = match config.models.provider {
        ProviderKind::Gemini => {
            let gemini = GeminiTextProvider::new(GeminiConfig {
                api_key: config.google.api_key.clone(),
                model: config.models.text_model.clone(),
                api_base: config.google.api_base.clone(),
                request_timeout: config.models.request_timeout(),
            })
            .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;
            Arc::new(gemini)
        }
        ProviderKind::Mock => {
            tracing::warn!("Using mock text provider; replies are canned");
            Arc::new(MockTextProvider::new())
        }
    };

    Ok(provider)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the backend named in `config`.
    pub async fn build(config: RelayConfig) -> Result<Self, AppError> {
        let provider = build_provider(&config)?;
        Self::build_with_provider(config, provider).await
    }

    /// Build the application around an already constructed backend.
    pub async fn build_with_provider(
        config: RelayConfig,
        provider: Arc<dyn TextProvider>,
    ) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let state = AppState::new(config, provider);

        tracing::info!(
            provider = %state.responder.provider_name(),
            model = %state.config.models.text_model,
            per_request = matches!(state.config.relay.instruction, InstructionSource::PerRequest),
            "Initialized responder"
        );

        // port 0 = random port for testing
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Relay service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until Ctrl-C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}
