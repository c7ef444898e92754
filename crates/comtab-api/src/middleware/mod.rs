//! Tower middleware for the API layer:
//! - [`metrics`]: Prometheus-compatible request metrics.

pub mod metrics;
