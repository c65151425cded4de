//! Prometheus metrics for feed generation, caching and background work.

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::time::Duration;

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_http_requests_total",
        "Total HTTP requests by method, path and status",
        &["method", "path", "status"]
    )
    .expect("Failed to register feed HTTP requests metric")
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "feed_http_request_duration_seconds",
        "HTTP request latency by method, path and status",
        &["method", "path", "status"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register feed HTTP request duration metric")
});

static CACHE_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_cache_lookups_total",
        "Feed cache lookups by result (hit/miss/expired/short/error)",
        &["feed_type", "result"]
    )
    .expect("Failed to register feed cache lookups metric")
});

static GENERATION_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "feed_generation_duration_seconds",
        "Time spent generating and ranking a feed on cache miss",
        &["feed_type"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register feed generation duration metric")
});

static BACKGROUND_TASKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_background_tasks_total",
        "Background tasks processed by kind and status",
        &["kind", "status"]
    )
    .expect("Failed to register feed background tasks metric")
});

static DEGRADATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_degradations_total",
        "Non-critical signals replaced by defaults",
        &["signal"]
    )
    .expect("Failed to register feed degradations metric")
});

static INTERACTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_interactions_recorded_total",
        "User interactions recorded",
        &["interaction_type"]
    )
    .expect("Failed to register feed interactions metric")
});

static CACHE_SWEEPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_cache_sweeps_total",
        "Expired cache sweep cycles (success/error)",
        &["status"]
    )
    .expect("Failed to register feed cache sweeps metric")
});

pub fn observe_http_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    let status_label = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status_label])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path, &status_label])
        .observe(elapsed.as_secs_f64());
}

pub fn record_cache_lookup(feed_type: &str, result: &str) {
    CACHE_LOOKUPS_TOTAL
        .with_label_values(&[feed_type, result])
        .inc();
}

pub fn observe_generation(feed_type: &str, elapsed: Duration) {
    GENERATION_DURATION_SECONDS
        .with_label_values(&[feed_type])
        .observe(elapsed.as_secs_f64());
}

pub fn record_background_task(kind: &str, status: &str) {
    BACKGROUND_TASKS_TOTAL.with_label_values(&[kind, status]).inc();
}

pub fn record_degradation(signal: &str) {
    DEGRADATIONS_TOTAL.with_label_values(&[signal]).inc();
}

pub fn record_interaction(interaction_type: &str) {
    INTERACTIONS_TOTAL
        .with_label_values(&[interaction_type])
        .inc();
}

pub fn record_cache_sweep(status: &str) {
    CACHE_SWEEPS_TOTAL.with_label_values(&[status]).inc();
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
