//! Serving observability
//!
//! Prometheus counters and histograms for the prediction API, rendered in
//! text format by `GET /metrics`.

pub mod metrics;

pub use metrics::Metrics;
