//! Prometheus Metrics
//!
//! Defines and initializes all Prometheus metrics for the sharder server.
//!
//! Metrics tracked:
//! - `sharder_connections_opened_total` - counter of accepted gateway connections
//! - `sharder_connections_closed_total` - counter of ended connections by reason
//! - `sharder_assignments_total` - counter of slot assignments by outcome
//! - `sharder_live_workers` - gauge of slots currently held by a connection
//! - `sharder_messages_routed_total` - counter of routed messages by address kind
//! - `sharder_messages_dropped_total` - counter of unicasts to empty slots
//! - `sharder_delivery_failures_total` - counter of sends to closed connections
//! - `sharder_route_duration_seconds` - histogram of routing times

use crate::coordinator::Delivery;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sharder_core::Address;
use std::time::Duration;

/// State containing the Prometheus handle for metrics export
#[derive(Clone)]
pub struct MetricsState {
    pub prometheus_handle: PrometheusHandle,
}

/// Initialize Prometheus metrics and return the handle for exporting.
pub fn init_metrics() -> Result<MetricsState, Box<dyn std::error::Error + Send + Sync>> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_metric_descriptions();

    Ok(MetricsState {
        prometheus_handle: handle,
    })
}

fn register_metric_descriptions() {
    // Connection metrics
    describe_counter!(
        "sharder_connections_opened_total",
        "Total number of gateway connections accepted"
    );
    describe_counter!(
        "sharder_connections_closed_total",
        "Total number of gateway connections ended"
    );
    describe_counter!(
        "sharder_assignments_total",
        "Total number of slot assignments by outcome"
    );
    describe_gauge!(
        "sharder_live_workers",
        "Number of slots currently held by a live connection"
    );

    // Routing metrics
    describe_counter!(
        "sharder_messages_routed_total",
        "Total number of routed messages by address kind"
    );
    describe_counter!(
        "sharder_messages_dropped_total",
        "Total number of unicast messages whose target slot was empty"
    );
    describe_counter!(
        "sharder_delivery_failures_total",
        "Total number of sends to connections that had already closed"
    );
    describe_histogram!(
        "sharder_route_duration_seconds",
        "Duration of message routing in seconds"
    );
}

/// Record an accepted gateway connection
pub fn record_connection_opened() {
    counter!("sharder_connections_opened_total").increment(1);
}

/// Record an ended gateway connection
pub fn record_connection_closed(reason: &str) {
    counter!("sharder_connections_closed_total", "reason" => reason.to_string()).increment(1);
}

/// Record the outcome of a slot assignment
pub fn record_assignment(outcome: &'static str) {
    counter!("sharder_assignments_total", "outcome" => outcome).increment(1);
    if outcome != "conflict" {
        gauge!("sharder_live_workers").increment(1.0);
    }
}

/// Record a slot released by its connection
pub fn record_worker_released() {
    gauge!("sharder_live_workers").decrement(1.0);
}

/// Record a routed message
pub fn record_routed(address: &Address, delivery: &Delivery, duration: Duration) {
    let kind = match address {
        Address::Broadcast => "broadcast",
        Address::Shard(_) => "shard",
        Address::Worker(_) => "worker",
    };
    counter!("sharder_messages_routed_total", "kind" => kind).increment(1);
    if delivery.dropped > 0 {
        counter!("sharder_messages_dropped_total").increment(delivery.dropped as u64);
    }
    if delivery.failed() > 0 {
        counter!("sharder_delivery_failures_total").increment(delivery.failed() as u64);
    }
    histogram!("sharder_route_duration_seconds", "kind" => kind).record(duration.as_secs_f64());
}
