//! Prometheus metrics for chat-service.
//!
//! HTTP request metrics come from the shared `metrics` middleware and are
//! rendered through the installed recorder; completion and transcript
//! metrics live in a dedicated registry.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static COMPLETIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static COMPLETION_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static COMPLETION_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static TRANSCRIPT_ERRORS_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Initialize all metrics. Must be called once at startup; later calls are
/// ignored.
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

    let completions = IntCounterVec::new(
        Opts::new("chat_completions_total", "Total completion requests"),
        &["provider", "outcome"], // outcome: success, error
    )
    .expect("Failed to create chat_completions_total metric");

    let latency = HistogramVec::new(
        HistogramOpts::new(
            "chat_completion_latency_seconds",
            "Completion provider latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        &["provider"],
    )
    .expect("Failed to create chat_completion_latency_seconds metric");

    let errors = IntCounterVec::new(
        Opts::new("chat_completion_errors_total", "Total completion errors"),
        &["provider", "error_type"],
    )
    .expect("Failed to create chat_completion_errors_total metric");

    let transcript_errors = IntCounter::new(
        "chat_transcript_errors_total",
        "Total failed transcript writes",
    )
    .expect("Failed to create chat_transcript_errors_total metric");

    registry
        .register(Box::new(completions.clone()))
        .expect("Failed to register chat_completions_total");
    registry
        .register(Box::new(latency.clone()))
        .expect("Failed to register chat_completion_latency_seconds");
    registry
        .register(Box::new(errors.clone()))
        .expect("Failed to register chat_completion_errors_total");
    registry
        .register(Box::new(transcript_errors.clone()))
        .expect("Failed to register chat_transcript_errors_total");

    let _ = PROMETHEUS_REGISTRY.set(registry);
    let _ = COMPLETIONS_TOTAL.set(completions);
    let _ = COMPLETION_LATENCY_SECONDS.set(latency);
    let _ = COMPLETION_ERRORS_TOTAL.set(errors);
    let _ = TRANSCRIPT_ERRORS_TOTAL.set(transcript_errors);
}

pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

/// Record a successful completion and its latency.
pub fn record_completion_success(provider: &str, latency_secs: f64) {
    if let Some(counter) = COMPLETIONS_TOTAL.get() {
        counter.with_label_values(&[provider, "success"]).inc();
    }
    if let Some(histogram) = COMPLETION_LATENCY_SECONDS.get() {
        histogram.with_label_values(&[provider]).observe(latency_secs);
    }
}

/// Record a failed completion.
pub fn record_completion_error(provider: &str, error_type: &str, latency_secs: f64) {
    if let Some(counter) = COMPLETIONS_TOTAL.get() {
        counter.with_label_values(&[provider, "error"]).inc();
    }
    if let Some(counter) = COMPLETION_ERRORS_TOTAL.get() {
        counter.with_label_values(&[provider, error_type]).inc();
    }
    if let Some(histogram) = COMPLETION_LATENCY_SECONDS.get() {
        histogram.with_label_values(&[provider]).observe(latency_secs);
    }
}

pub fn record_transcript_error() {
    if let Some(counter) = TRANSCRIPT_ERRORS_TOTAL.get() {
        counter.inc();
    }
}
