//! Message Router
//!
//! Delivers inbound worker messages by their `to` address:
//!
//! - `*:*` fans out to every live connection
//! - `*:<shard>` goes to the virtual worker of that shard
//! - `<slot>:<any>` goes to that slot
//!
//! Unicast to an empty slot is dropped without error. Delivery is best effort
//! and nothing is buffered on behalf of absent workers.

use super::connection::{Connection, Outbound};
use super::error::RouteError;
use super::registry::ConnectionRegistry;
use crate::observability::metrics;
use futures::future::join_all;
use serde_json::Value;
use sharder_core::{resolve_worker, Address, ShardId, WorkerSlot};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// Outcome of routing a single message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Connections the message was handed to.
    pub targeted: usize,
    /// Connections that accepted the message into their queue.
    pub delivered: usize,
    /// Unicast messages whose target slot was empty.
    pub dropped: usize,
}

impl Delivery {
    pub fn failed(&self) -> usize {
        self.targeted - self.delivered
    }
}

#[derive(Debug, Clone)]
pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
    first_shard: ShardId,
    workers: usize,
}

impl MessageRouter {
    /// Router over `registry`, resolving shard addresses against its partition.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        let partition = registry.partition();
        let first_shard = partition.range().first;
        let workers = partition.workers();
        Self {
            registry,
            first_shard,
            workers,
        }
    }

    /// Route a decoded message by its `to` field, forwarding `payload` verbatim.
    pub async fn route_message(
        &self,
        message: &Value,
        payload: Outbound,
    ) -> Result<Delivery, RouteError> {
        let address: Address = message
            .get("to")
            .and_then(Value::as_str)
            .ok_or(RouteError::MissingTarget)?
            .parse()?;
        Ok(self.route(address, payload).await)
    }

    pub async fn route(&self, address: Address, payload: Outbound) -> Delivery {
        let start = Instant::now();
        let delivery = match address {
            Address::Broadcast => self.broadcast(payload).await,
            Address::Shard(shard) => {
                let slot = resolve_worker(shard, self.first_shard, self.workers);
                trace!(shard, slot, "Resolved shard to virtual worker");
                self.unicast(slot, payload).await
            }
            Address::Worker(slot) => self.unicast(slot, payload).await,
        };
        metrics::record_routed(&address, &delivery, start.elapsed());
        delivery
    }

    /// Deliver to every live connection. Each send is independent.
    pub async fn broadcast(&self, payload: Outbound) -> Delivery {
        let recipients = self.registry.live_connections().await;
        let targeted = recipients.len();

        let results = join_all(recipients.iter().map(|conn| {
            let payload = payload.clone();
            async move { (conn.id(), conn.send(payload).await) }
        }))
        .await;

        let mut delivered = 0;
        for (id, result) in results {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => debug!(connection_id = %id, error = %e, "Broadcast delivery failed"),
            }
        }

        Delivery {
            targeted,
            delivered,
            dropped: 0,
        }
    }

    /// Deliver to one slot, dropping the message if the slot is empty.
    pub async fn unicast(&self, slot: WorkerSlot, payload: Outbound) -> Delivery {
        let Some(conn) = self.registry.get(slot).await else {
            debug!(slot, "Target slot is empty, dropping message");
            return Delivery {
                dropped: 1,
                ..Delivery::default()
            };
        };
        Self::deliver(slot, &conn, payload).await
    }

    async fn deliver(slot: WorkerSlot, conn: &Connection, payload: Outbound) -> Delivery {
        let delivered = match conn.send(payload).await {
            Ok(()) => 1,
            Err(e) => {
                debug!(slot, error = %e, "Unicast delivery failed");
                0
            }
        };
        Delivery {
            targeted: 1,
            delivered,
            dropped: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::registry::Assignment;
    use serde_json::json;
    use sharder_core::{AddressError, Partition};
    use tokio::sync::mpsc;

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        router: MessageRouter,
    }

    impl Fixture {
        fn new(first: ShardId, last: ShardId, workers: usize) -> Self {
            let partition = Arc::new(Partition::new(first, last, workers).unwrap());
            let registry = Arc::new(ConnectionRegistry::new(partition));
            let router = MessageRouter::new(registry.clone());
            Self { registry, router }
        }

        async fn connect(&self, slot: WorkerSlot) -> mpsc::Receiver<Outbound> {
            let (conn, rx) = Connection::channel(16);
            assert!(matches!(
                self.registry.assign(Some(slot), conn).await,
                Assignment::Assigned { .. }
            ));
            rx
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_live_connection() {
        let fixture = Fixture::new(0, 7, 3);
        let mut rx0 = fixture.connect(0).await;
        let mut rx2 = fixture.connect(2).await;

        let delivery = fixture.router.route(Address::Broadcast, Outbound::text("hi")).await;

        assert_eq!(
            delivery,
            Delivery {
                targeted: 2,
                delivered: 2,
                dropped: 0
            }
        );
        assert_eq!(rx0.try_recv().unwrap(), Outbound::text("hi"));
        assert_eq!(rx2.try_recv().unwrap(), Outbound::text("hi"));
    }

    #[tokio::test]
    async fn test_broadcast_contains_failures() {
        let fixture = Fixture::new(0, 7, 3);
        let mut rx0 = fixture.connect(0).await;
        drop(fixture.connect(1).await);
        let mut rx2 = fixture.connect(2).await;

        let delivery = fixture.router.broadcast(Outbound::text("x")).await;

        assert_eq!(delivery.targeted, 3);
        assert_eq!(delivery.delivered, 2);
        assert_eq!(delivery.failed(), 1);
        assert!(rx0.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_shard_address_uses_resolver() {
        let fixture = Fixture::new(10, 29, 4);
        let mut receivers = Vec::new();
        for slot in 0..4 {
            receivers.push(fixture.connect(slot).await);
        }

        fixture.router.route(Address::Shard(13), Outbound::text("s")).await;

        let target = resolve_worker(13, 10, 4);
        for (slot, rx) in receivers.iter_mut().enumerate() {
            assert_eq!(rx.try_recv().is_ok(), slot == target, "slot {slot}");
        }
    }

    #[tokio::test]
    async fn test_worker_address_is_direct() {
        let fixture = Fixture::new(0, 7, 3);
        let mut rx0 = fixture.connect(0).await;
        let mut rx1 = fixture.connect(1).await;

        let message = json!({"to": "1:5"});
        let delivery = fixture
            .router
            .route_message(&message, Outbound::text("direct"))
            .await
            .unwrap();

        assert_eq!(delivery.delivered, 1);
        assert_eq!(rx1.try_recv().unwrap(), Outbound::text("direct"));
        assert!(rx0.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_empty_slot_drops_silently() {
        let fixture = Fixture::new(0, 7, 3);
        let mut rx0 = fixture.connect(0).await;

        let delivery = fixture.router.route(Address::Worker(2), Outbound::text("lost")).await;
        assert_eq!(
            delivery,
            Delivery {
                targeted: 0,
                delivered: 0,
                dropped: 1
            }
        );

        let delivery = fixture.router.route(Address::Worker(40), Outbound::text("lost")).await;
        assert_eq!(delivery.dropped, 1);
        assert!(rx0.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_per_destination_order_is_preserved() {
        let fixture = Fixture::new(0, 7, 2);
        let mut rx1 = fixture.connect(1).await;

        for i in 0..10 {
            fixture
                .router
                .route(Address::Worker(1), Outbound::text(i.to_string()))
                .await;
        }
        for i in 0..10 {
            assert_eq!(rx1.try_recv().unwrap(), Outbound::text(i.to_string()));
        }
    }

    #[tokio::test]
    async fn test_malformed_messages_are_errors() {
        let fixture = Fixture::new(0, 7, 3);

        let missing = fixture
            .router
            .route_message(&json!({"x": 1}), Outbound::text("x"))
            .await;
        assert_eq!(missing, Err(RouteError::MissingTarget));

        let not_string = fixture
            .router
            .route_message(&json!({"to": 5}), Outbound::text("x"))
            .await;
        assert_eq!(not_string, Err(RouteError::MissingTarget));

        let bad = fixture
            .router
            .route_message(&json!({"to": "one:*"}), Outbound::text("x"))
            .await;
        assert_eq!(
            bad,
            Err(RouteError::Address(AddressError::InvalidSelector("one".to_string())))
        );
    }
}
