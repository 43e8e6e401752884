//! Prometheus metrics definitions for the prediction API
//!
//! All metrics use the `house_price_` prefix.

use prometheus::{
    CounterVec, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Requests by endpoint and outcome
    pub requests_total: CounterVec,
    /// Scored records by outcome (success or error kind)
    pub predictions_total: CounterVec,
    /// Request latency in seconds per endpoint
    pub request_latency_seconds: HistogramVec,
    /// Items per batch request
    pub batch_size: Histogram,
    /// 1 when a model is loaded, 0 otherwise
    pub model_loaded: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new(
                "house_price_requests_total",
                "Total API requests by endpoint and outcome",
            ),
            &["endpoint", "outcome"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let predictions_total = CounterVec::new(
            Opts::new(
                "house_price_predictions_total",
                "Total scored records by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let request_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "house_price_request_latency_seconds",
                "API request latency in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
            ]),
            &["endpoint"],
        )?;
        registry.register(Box::new(request_latency_seconds.clone()))?;

        let batch_size = Histogram::with_opts(
            HistogramOpts::new("house_price_batch_size", "Items per batch request")
                .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        )?;
        registry.register(Box::new(batch_size.clone()))?;

        let model_loaded = Gauge::with_opts(Opts::new(
            "house_price_model_loaded",
            "Model load status (1=loaded, 0=unavailable)",
        ))?;
        registry.register(Box::new(model_loaded.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            predictions_total,
            request_latency_seconds,
            batch_size,
            model_loaded,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn set_model_loaded(&self, loaded: bool) {
        self.model_loaded.set(if loaded { 1.0 } else { 0.0 });
    }

    /// Increment request counter
    pub fn inc_requests(&self, endpoint: &str, outcome: &str) {
        self.requests_total
            .with_label_values(&[endpoint, outcome])
            .inc();
    }

    pub fn inc_predictions(&self, outcome: &str) {
        self.predictions_total.with_label_values(&[outcome]).inc();
    }

    /// Observe request latency
    pub fn observe_latency(&self, endpoint: &str, latency: f64) {
        self.request_latency_seconds
            .with_label_values(&[endpoint])
            .observe(latency);
    }

    pub fn observe_batch_size(&self, size: usize) {
        self.batch_size.observe(size as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        assert!(metrics.render().contains("house_price_"));
    }

    #[test]
    fn test_model_loaded_gauge() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.set_model_loaded(true);
        assert!(metrics.render().contains("house_price_model_loaded 1"));
        metrics.set_model_loaded(false);
        assert!(metrics.render().contains("house_price_model_loaded 0"));
    }

    #[test]
    fn test_request_counter_labels() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_requests("predict", "success");
        metrics.inc_requests("batch_predict", "batch_too_large");
        let output = metrics.render();
        assert!(output.contains("house_price_requests_total"));
        assert!(output.contains("batch_too_large"));
    }

    #[test]
    fn test_batch_size_histogram() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.observe_batch_size(3);
        assert!(metrics.render().contains("house_price_batch_size_count 1"));
    }
}
