// Metrics module - Prometheus counters and histograms for the gateway
//
// Registered once against the default registry, which is the one Pingora's
// Prometheus HTTP service exports.

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use std::time::Duration;

use crate::image_optimizer::TransformMetrics;

/// Global metrics for request handling, rate limiting and transforms
pub struct GatewayMetrics {
    /// Responses by method and status code
    pub requests: IntCounterVec,

    /// Requests rejected by the rate limiter
    pub rate_limited: IntCounter,

    /// Requests admitted without an identifiable client
    pub rate_limit_unidentified: IntCounter,

    /// Transforms by output format
    pub transforms: IntCounterVec,

    /// Transform failures by pipeline stage
    pub transform_failures: IntCounterVec,

    /// Transform duration histogram (in seconds), by output format
    pub transform_duration: HistogramVec,

    /// Bytes written by uploads
    pub uploaded_bytes: IntCounter,

    /// Bytes served to clients
    pub served_bytes: IntCounter,
}

static METRICS: OnceLock<GatewayMetrics> = OnceLock::new();

impl GatewayMetrics {
    /// Initialize and return the global metrics instance
    ///
    /// Subsequent calls return the same instance.
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| {
            let requests = register_int_counter_vec!(
                "imgate_requests_total",
                "Total number of responses by method and status",
                &["method", "status"]
            )
            .expect("Failed to register imgate_requests_total metric");

            let rate_limited = register_int_counter!(
                "imgate_rate_limited_total",
                "Total number of requests rejected by the rate limiter"
            )
            .expect("Failed to register imgate_rate_limited_total metric");

            let rate_limit_unidentified = register_int_counter!(
                "imgate_rate_limit_unidentified_total",
                "Total number of requests with no client identifier"
            )
            .expect("Failed to register imgate_rate_limit_unidentified_total metric");

            let transforms = register_int_counter_vec!(
                "imgate_transforms_total",
                "Total number of completed image transforms by output format",
                &["format"]
            )
            .expect("Failed to register imgate_transforms_total metric");

            let transform_failures = register_int_counter_vec!(
                "imgate_transform_failures_total",
                "Total number of failed image transforms by stage",
                &["stage"] // decode, resize, encode, cancelled, panic
            )
            .expect("Failed to register imgate_transform_failures_total metric");

            let transform_duration = register_histogram_vec!(
                "imgate_transform_duration_seconds",
                "Duration of image transforms in seconds",
                &["format"],
                vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0] // 1ms to 5s
            )
            .expect("Failed to register imgate_transform_duration_seconds metric");

            let uploaded_bytes = register_int_counter!(
                "imgate_uploaded_bytes_total",
                "Total number of bytes stored by uploads"
            )
            .expect("Failed to register imgate_uploaded_bytes_total metric");

            let served_bytes = register_int_counter!(
                "imgate_served_bytes_total",
                "Total number of body bytes served"
            )
            .expect("Failed to register imgate_served_bytes_total metric");

            GatewayMetrics {
                requests,
                rate_limited,
                rate_limit_unidentified,
                transforms,
                transform_failures,
                transform_duration,
                uploaded_bytes,
                served_bytes,
            }
        })
    }

    pub fn record_response(&self, method: &str, status: u16, body_len: usize) {
        self.requests
            .with_label_values(&[method_label(method), &status.to_string()])
            .inc();
        self.served_bytes.inc_by(body_len as u64);
    }

    pub fn record_transform(&self, metrics: &TransformMetrics) {
        let format = metrics.output_format.as_str();
        self.transforms.with_label_values(&[format]).inc();
        self.observe_transform_duration(format, metrics.processing_time);
    }

    pub fn record_transform_failure(&self, stage: &str) {
        self.transform_failures.with_label_values(&[stage]).inc();
    }

    fn observe_transform_duration(&self, format: &str, duration: Duration) {
        self.transform_duration
            .with_label_values(&[format])
            .observe(duration.as_secs_f64());
    }
}

/// Methods the gateway serves keep their name; anything else shares one label
fn method_label(method: &str) -> &'static str {
    if method.eq_ignore_ascii_case("GET") {
        "GET"
    } else if method.eq_ignore_ascii_case("PUT") {
        "PUT"
    } else {
        "other"
    }
}
