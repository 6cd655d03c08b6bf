//! Core shared types and logic for sharder
//!
//! This crate holds the I/O-free parts of the coordinator: shard partitioning,
//! virtual worker resolution, routing addresses and the outbound event shapes
//! that workers receive over the gateway.

pub mod address;
pub mod error;
pub mod events;
pub mod partition;
pub mod resolver;

pub use address::Address;
pub use error::{AddressError, ConfigError};
pub use events::Event;
pub use partition::{partition, Partition, ShardRange};
pub use resolver::resolve_worker;

/// An addressable unit of partitioned work.
pub type ShardId = i64;

/// Coordinator-local identity of a connected worker.
pub type WorkerSlot = usize;
