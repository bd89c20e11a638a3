//! # streamdecode-observability
//!
//! OpenTelemetry-based observability for streamdecode.
//!
//! ## Built-in metrics
//! - `streamdecode.records_read`        : counter, tagged with pipeline
//! - `streamdecode.values_decoded`      : counter, tagged with pipeline
//! - `streamdecode.decode_errors`       : counter, tagged with pipeline + error_type
//! - `streamdecode.backpressure_waits`  : counter, tagged with pipeline
//! - `streamdecode.producer_errors`     : counter, tagged with pipeline + error_type
//! - `streamdecode.decode_latency_ms`   : histogram
//!
//! ## Structured logging
//! Text or JSON logs via `tracing-subscriber`, with per-crate levels.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::PipelineMetrics;
pub use tracing_setup::{init_tracing, LogConfig};
