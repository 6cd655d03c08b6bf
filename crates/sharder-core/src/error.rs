//! Error types shared by the coordinator

use crate::ShardId;
use thiserror::Error;

/// Invalid startup configuration. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("worker count must be positive")]
    InvalidWorkerCount,
    #[error("invalid shard range: first shard {first} is greater than last shard {last}")]
    InvalidShardRange { first: ShardId, last: ShardId },
}

/// A routing address that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address {0:?} is missing the ':' separator")]
    MissingSeparator(String),
    #[error("address {0:?} has more than two selectors")]
    TooManySelectors(String),
    #[error("selector {0:?} is neither an integer nor '*'")]
    InvalidSelector(String),
}
