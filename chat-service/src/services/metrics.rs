//! Prometheus metrics for chat-service.
//!
//! HTTP metrics come from the `metrics` facade (service-core middleware) and
//! are rendered by the Prometheus recorder; chat-specific metrics live in a
//! dedicated `prometheus` registry. Both are exposed on `/metrics`.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;
use std::time::Duration;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static CHAT_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static CHAT_MODEL_ATTEMPTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static CHAT_PROVIDER_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize metrics collection. Must be called once at startup; later calls
/// are ignored.
pub fn init_metrics() {
    if PROMETHEUS_REGISTRY.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!("Failed to install Prometheus recorder: {}", e),
    }

    let registry = Registry::new();

    // Outcome: ok, invalid_request, not_configured, quota_exhausted, failed
    let chat_requests = IntCounterVec::new(
        Opts::new("chat_requests_total", "Total chat requests by outcome"),
        &["outcome"],
    )
    .expect("Failed to create chat_requests_total metric");

    // Outcome: success, transient, permanent, unclassified
    let model_attempts = IntCounterVec::new(
        Opts::new(
            "chat_model_attempts_total",
            "Generation attempts by candidate model and outcome",
        ),
        &["model", "outcome"],
    )
    .expect("Failed to create chat_model_attempts_total metric");

    let provider_latency = HistogramVec::new(
        HistogramOpts::new(
            "chat_provider_latency_seconds",
            "Provider generation latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["model"],
    )
    .expect("Failed to create chat_provider_latency_seconds metric");

    registry
        .register(Box::new(chat_requests.clone()))
        .expect("Failed to register chat_requests_total");
    registry
        .register(Box::new(model_attempts.clone()))
        .expect("Failed to register chat_model_attempts_total");
    registry
        .register(Box::new(provider_latency.clone()))
        .expect("Failed to register chat_provider_latency_seconds");

    let _ = PROMETHEUS_REGISTRY.set(registry);
    let _ = CHAT_REQUESTS_TOTAL.set(chat_requests);
    let _ = CHAT_MODEL_ATTEMPTS_TOTAL.set(model_attempts);
    let _ = CHAT_PROVIDER_LATENCY_SECONDS.set(provider_latency);
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        let encoder = TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

pub fn record_chat_request(outcome: &str) {
    if let Some(counter) = CHAT_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn record_model_attempt(model: &str, outcome: &str, elapsed: Duration) {
    if let Some(counter) = CHAT_MODEL_ATTEMPTS_TOTAL.get() {
        counter.with_label_values(&[model, outcome]).inc();
    }
    if let Some(histogram) = CHAT_PROVIDER_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[model])
            .observe(elapsed.as_secs_f64());
    }
}
