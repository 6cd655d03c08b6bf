//! Sharder Server Library
//!
//! WebSocket coordinator that hands each connecting worker a slot and its
//! shard list, then routes messages between workers by slot or shard.

pub mod api;
pub mod config;
pub mod coordinator;
pub mod observability;
pub mod version;
