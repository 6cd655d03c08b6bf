//! Sharder Server - Shard Coordinator for Worker Fleets

use anyhow::Context;
use clap::Parser;
use sharder_server::api::{self, AppState};
use sharder_server::config::Cli;
use sharder_server::coordinator::Coordinator;
use sharder_server::observability::{self, events, TracingConfig};
use sharder_server::version;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    observability::init_tracing(TracingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    info!(version = %version::full_version(), "Starting Sharder Server...");

    let coordinator = Arc::new(
        Coordinator::new(cli.coordinator_config()).context("invalid shard configuration")?,
    );

    let mut state = AppState::new(coordinator.clone());
    match observability::init_metrics() {
        Ok(metrics_state) => state = state.with_metrics(metrics_state),
        Err(e) => warn!(error = %e, "Metrics disabled"),
    }

    let app = api::create_router(state.clone());

    info!(bind_addr = %cli.bind_addr, "Starting gateway server");
    let listener = tokio::net::TcpListener::bind(&cli.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind_addr))?;
    state.mark_ready();

    let grace = cli.shutdown_grace();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(coordinator, grace))
        .await
        .context("server error")?;

    observability::shutdown_tracing();
    Ok(())
}

/// Resolve once a termination signal arrived and every worker connection was
/// closed, or the grace period ran out.
async fn shutdown_signal(coordinator: Arc<Coordinator>, grace: Duration) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    let live = coordinator.registry().live_count().await;
    info!(live_connections = live, "Shutdown signal received");
    let remaining = coordinator.shutdown(grace).await;
    if remaining > 0 {
        warn!(remaining, "Grace period elapsed with workers still connected");
    }
    events::coordinator_shutdown(live, remaining);
}
