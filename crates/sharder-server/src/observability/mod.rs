//! Observability Module
//!
//! - `metrics`: Prometheus metrics for connections, assignments, and routing
//! - `events`: Structured event logging with consistent fields
//! - `tracing`: Logging subscriber and optional OpenTelemetry export

pub mod events;
pub mod metrics;
pub mod tracing;

pub use metrics::{init_metrics, MetricsState};
pub use tracing::{init_tracing, shutdown_tracing, TracingConfig};
