//! Observability: structured logging via `tracing` (initialized in main)
//! and opt-in Prometheus metrics.

pub mod metrics;
