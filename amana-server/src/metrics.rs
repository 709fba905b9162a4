//! Prometheus metrics collection for the bookstore server

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Instant;

/// Initialize all metric descriptions
pub fn init_metrics() {
    // Counters
    describe_counter!("amana_books_created_total", "Total number of books added");
    describe_counter!("amana_reviews_created_total", "Total number of reviews added");
    describe_counter!(
        "amana_auth_rejections_total",
        "Total number of requests rejected by the token gate"
    );
    describe_counter!("amana_errors_total", "Total number of error responses");

    // Histograms
    describe_histogram!(
        "amana_write_latency_seconds",
        "Latency of catalogue writes including persistence, in seconds"
    );

    // Gauges
    describe_gauge!("amana_books_count", "Number of books in the catalogue");
    describe_gauge!("amana_reviews_count", "Number of reviews in the catalogue");
}

/// Record a newly added book
pub fn record_book_created() {
    counter!("amana_books_created_total", 1);
}

/// Record a newly added review
pub fn record_review_created(rating: u8) {
    counter!("amana_reviews_created_total", 1, "rating" => rating.to_string());
}

/// Record a request turned away by the token gate
pub fn record_auth_rejection(reason: &'static str) {
    counter!("amana_auth_rejections_total", 1, "reason" => reason);
}

/// Record an error response
pub fn record_error(error_type: &'static str) {
    counter!("amana_errors_total", 1, "type" => error_type);
}

/// Update collection size gauges
pub fn update_catalogue_metrics(books: usize, reviews: usize) {
    gauge!("amana_books_count", books as f64);
    gauge!("amana_reviews_count", reviews as f64);
}

/// Timer for measuring operation latency
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
    operation: &'static str,
}

impl LatencyTimer {
    pub fn new(metric_name: &'static str, operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
            operation,
        }
    }

    pub fn record(self) {
        let elapsed = self.start.elapsed().as_secs_f64();
        histogram!(self.metric_name, elapsed, "operation" => self.operation);
    }
}

/// Storage for Prometheus handle
static PROMETHEUS_HANDLE: std::sync::OnceLock<metrics_exporter_prometheus::PrometheusHandle> =
    std::sync::OnceLock::new();

/// Initialize Prometheus exporter and return the handle
pub fn init_prometheus() -> anyhow::Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let handle = builder.install_recorder()?;
    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("Failed to set Prometheus handle"))?;
    Ok(())
}

/// Get Prometheus metrics string
pub fn get_prometheus_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Prometheus metrics not initialized\n".to_string())
}
