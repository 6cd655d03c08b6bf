//! Application State
//!
//! Shared state passed to all API handlers.

use crate::coordinator::Coordinator;
use crate::observability::MetricsState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub metrics_state: Option<MetricsState>,
    pub readiness: Arc<AtomicBool>,
}

impl AppState {
    /// State with metrics disabled and readiness unset.
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self {
            coordinator,
            metrics_state: None,
            readiness: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_metrics(mut self, metrics_state: MetricsState) -> Self {
        self.metrics_state = Some(metrics_state);
        self
    }

    pub fn mark_ready(&self) {
        self.readiness.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.load(Ordering::Acquire) && !self.coordinator.is_shutting_down()
    }
}
