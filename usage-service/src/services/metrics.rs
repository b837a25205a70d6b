//! Metrics module for usage-service.
//! Provides Prometheus metrics for backend calls and cost computations.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Backend request duration histogram
pub static BACKEND_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "usage_backend_request_duration_seconds",
            "Rating backend request duration including retries",
            vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        ),
        &["operation"]
    )
    .expect("Failed to register BACKEND_REQUEST_DURATION")
});

/// Backend requests counter
pub static BACKEND_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Cost history computations counter (per-tenant)
pub static COST_COMPUTATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Skipped malformed records counter
pub static INTEGRITY_SKIPS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Closed-month cache lookups counter
pub static CACHE_LOOKUPS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    BACKEND_REQUESTS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "usage_backend_requests_total",
                "Total rating backend requests by operation and outcome"
            ),
            &["operation", "outcome"]
        )
        .expect("Failed to register BACKEND_REQUESTS_TOTAL")
    });

    COST_COMPUTATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "usage_cost_computations_total",
                "Total cost history computations by tenant and outcome"
            ),
            &["tenant_id", "outcome"]
        )
        .expect("Failed to register COST_COMPUTATIONS_TOTAL")
    });

    INTEGRITY_SKIPS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "usage_integrity_skips_total",
                "Backend records skipped because they were malformed"
            ),
            &["kind"]
        )
        .expect("Failed to register INTEGRITY_SKIPS_TOTAL")
    });

    CACHE_LOOKUPS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "usage_cache_lookups_total",
                "Closed-month cache lookups by result"
            ),
            &["result"]
        )
        .expect("Failed to register CACHE_LOOKUPS_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*BACKEND_REQUEST_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a backend request outcome.
pub fn record_backend_request(operation: &str, outcome: &str) {
    if let Some(counter) = BACKEND_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[operation, outcome]).inc();
    }
}

/// Record backend request duration.
pub fn record_backend_request_duration(operation: &str, duration_secs: f64) {
    BACKEND_REQUEST_DURATION
        .with_label_values(&[operation])
        .observe(duration_secs);
}

/// Record a cost history computation.
pub fn record_cost_computation(tenant_id: &str, outcome: &str) {
    if let Some(counter) = COST_COMPUTATIONS_TOTAL.get() {
        counter.with_label_values(&[tenant_id, outcome]).inc();
    }
}

/// Record a skipped malformed record.
pub fn record_integrity_skip(kind: &str) {
    if let Some(counter) = INTEGRITY_SKIPS_TOTAL.get() {
        counter.with_label_values(&[kind]).inc();
    }
}

/// Record a closed-month cache lookup.
pub fn record_cache_lookup(hit: bool) {
    if let Some(counter) = CACHE_LOOKUPS_TOTAL.get() {
        counter
            .with_label_values(&[if hit { "hit" } else { "miss" }])
            .inc();
    }
}
