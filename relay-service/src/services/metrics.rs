//! Prometheus metrics for relay-service.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::{Mutex, OnceLock, PoisonError};

static INIT_LOCK: Mutex<()> = Mutex::new(());

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// Relay metrics
pub static RELAY_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

// Backend metrics
pub static GENAI_TOKENS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static GENAI_PROVIDER_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static GENAI_PROVIDER_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Later calls are no-ops.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if REGISTRY.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    // outcome: ok, bad_request, error
    let relay_requests = IntCounterVec::new(
        Opts::new("relay_requests_total", "Total /ai requests by outcome"),
        &["method", "outcome"],
    )?;

    let genai_tokens = IntCounterVec::new(
        Opts::new("genai_tokens_total", "Total tokens processed"),
        &["model", "type"], // type: input, output
    )?;

    let provider_latency = HistogramVec::new(
        HistogramOpts::new(
            "genai_provider_latency_seconds",
            "AI provider API latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["provider", "model"],
    )?;

    let provider_errors = IntCounterVec::new(
        Opts::new("genai_provider_errors_total", "Total AI provider errors"),
        &["provider", "error_type"],
    )?;

    registry.register(Box::new(relay_requests.clone()))?;
    registry.register(Box::new(genai_tokens.clone()))?;
    registry.register(Box::new(provider_latency.clone()))?;
    registry.register(Box::new(provider_errors.clone()))?;

    let _ = REGISTRY.set(registry);
    let _ = RELAY_REQUESTS_TOTAL.set(relay_requests);
    let _ = GENAI_TOKENS_TOTAL.set(genai_tokens);
    let _ = GENAI_PROVIDER_LATENCY_SECONDS.set(provider_latency);
    let _ = GENAI_PROVIDER_ERRORS_TOTAL.set(provider_errors);

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

/// Record a finished `/ai` request.
pub fn record_relay_request(method: &str, outcome: &str) {
    if let Some(counter) = RELAY_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[method, outcome]).inc();
    }
}

/// Record token usage for a backend call.
pub fn record_tokens(model: &str, input_tokens: i32, output_tokens: i32) {
    if let Some(counter) = GENAI_TOKENS_TOTAL.get() {
        counter
            .with_label_values(&[model, "input"])
            .inc_by(input_tokens.max(0) as u64);
        counter
            .with_label_values(&[model, "output"])
            .inc_by(output_tokens.max(0) as u64);
    }
}

/// Record provider latency.
pub fn record_provider_latency(provider: &str, model: &str, duration_secs: f64) {
    if let Some(histogram) = GENAI_PROVIDER_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[provider, model])
            .observe(duration_secs);
    }
}

/// Record a provider error.
pub fn record_provider_error(provider: &str, error_type: &str) {
    if let Some(counter) = GENAI_PROVIDER_ERRORS_TOTAL.get() {
        counter.with_label_values(&[provider, error_type]).inc();
    }
}
