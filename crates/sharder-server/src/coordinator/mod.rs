//! Connection Coordinator
//!
//! The routing core of the server: the registry of worker connections, the
//! per-connection gateway state machine, and the message router.
//!
//! ```text
//! worker ──ws──> gateway ──assign──> ConnectionRegistry
//!                   │                      ▲
//!                   └──route──> MessageRouter ──send──> worker queues
//! ```
//!
//! All gateways share one [`Coordinator`]. The partition is computed once when
//! it is built and never changes. Each gateway task holds a [`GatewayTicket`]
//! until its socket is fully written, which is what shutdown waits on.

pub mod codec;
pub mod connection;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod router;

pub use codec::{JsonCodec, PayloadCodec};
pub use connection::{Connection, ConnectionId, Outbound};
pub use error::{CodecError, RouteError, SendError};
pub use gateway::GatewayState;
pub use registry::{Assignment, ConnectionRegistry, SlotSnapshot, SlotState};
pub use router::{Delivery, MessageRouter};

use crate::config::CoordinatorConfig;
use sharder_core::{ConfigError, Partition};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Shared state for every gateway connection.
pub struct Coordinator {
    config: CoordinatorConfig,
    partition: Arc<Partition>,
    registry: Arc<ConnectionRegistry>,
    router: MessageRouter,
    codec: Arc<dyn PayloadCodec>,
    shutdown_tx: watch::Sender<bool>,
    gateways: Arc<watch::Sender<usize>>,
}

/// Held by a gateway task for its whole lifetime, including the final flush of
/// its outbound queue. Dropping it marks the task finished.
#[derive(Debug)]
pub struct GatewayTicket {
    gateways: Arc<watch::Sender<usize>>,
}

impl Drop for GatewayTicket {
    fn drop(&mut self) {
        self.gateways.send_modify(|running| *running -= 1);
    }
}

impl Coordinator {
    /// Build the coordinator with the default JSON codec.
    pub fn new(config: CoordinatorConfig) -> Result<Self, ConfigError> {
        Self::with_codec(config, Arc::new(JsonCodec))
    }

    /// Build the coordinator, computing the shard partition.
    ///
    /// Fails if the shard range is inverted or the worker count is zero.
    pub fn with_codec(
        config: CoordinatorConfig,
        codec: Arc<dyn PayloadCodec>,
    ) -> Result<Self, ConfigError> {
        let partition = Arc::new(Partition::new(
            config.first_shard,
            config.last_shard,
            config.workers,
        )?);
        let registry = Arc::new(ConnectionRegistry::new(partition.clone()));
        let router = MessageRouter::new(registry.clone());
        let (shutdown_tx, _) = watch::channel(false);
        let (gateways, _) = watch::channel(0);

        info!(
            first_shard = config.first_shard,
            last_shard = config.last_shard,
            workers = config.workers,
            "Shard partition computed"
        );

        Ok(Self {
            config,
            partition,
            registry,
            router,
            codec,
            shutdown_tx,
            gateways: Arc::new(gateways),
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn codec(&self) -> &dyn PayloadCodec {
        self.codec.as_ref()
    }

    /// Receiver that flips to `true` when the server starts shutting down.
    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Register a running gateway task.
    pub fn track_gateway(&self) -> GatewayTicket {
        self.gateways.send_modify(|running| *running += 1);
        GatewayTicket {
            gateways: self.gateways.clone(),
        }
    }

    /// Gateway tasks that have not finished yet.
    pub fn running_gateways(&self) -> usize {
        *self.gateways.borrow()
    }

    /// Tell every gateway to close its connection with "going away", then
    /// wait up to `grace` for every gateway task to finish writing.
    ///
    /// Returns the number of gateway tasks still running when the wait ended.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        self.shutdown_tx.send_replace(true);
        let live_connections = self.registry.live_count().await;
        info!(
            live_connections,
            running_gateways = self.running_gateways(),
            "Closing worker connections"
        );

        let mut running = self.gateways.subscribe();
        let _ = tokio::time::timeout(grace, running.wait_for(|n| *n == 0)).await;
        self.running_gateways()
    }
}
