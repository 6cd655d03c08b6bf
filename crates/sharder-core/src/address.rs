//! Routing Addresses
//!
//! Every routed message carries a `to` field of the form
//! `<worker-selector>:<shard-selector>`, where each selector is an integer or
//! the `*` wildcard.
//!
//! | address     | meaning                                        |
//! |-------------|------------------------------------------------|
//! | `*:*`       | every live worker                              |
//! | `*:<shard>` | the virtual worker of `<shard>`                |
//! | `<slot>:*`  | worker `<slot>`                                |
//! | `<slot>:<n>`| worker `<slot>`, shard selector ignored        |

use crate::error::AddressError;
use crate::{ShardId, WorkerSlot};
use std::fmt;
use std::str::FromStr;

const WILDCARD: &str = "*";

/// Parsed routing target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    Broadcast,
    Shard(ShardId),
    Worker(WorkerSlot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selector<T> {
    Any,
    Exact(T),
}

impl<T: FromStr> Selector<T> {
    fn parse(raw: &str) -> Result<Self, AddressError> {
        if raw == WILDCARD {
            return Ok(Selector::Any);
        }
        raw.parse()
            .map(Selector::Exact)
            .map_err(|_| AddressError::InvalidSelector(raw.to_string()))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (worker, shard) = s
            .split_once(':')
            .ok_or_else(|| AddressError::MissingSeparator(s.to_string()))?;
        if shard.contains(':') {
            return Err(AddressError::TooManySelectors(s.to_string()));
        }

        let worker = Selector::<WorkerSlot>::parse(worker)?;
        let shard = Selector::<ShardId>::parse(shard)?;

        Ok(match (worker, shard) {
            (Selector::Any, Selector::Any) => Address::Broadcast,
            (Selector::Any, Selector::Exact(shard)) => Address::Shard(shard),
            (Selector::Exact(slot), _) => Address::Worker(slot),
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Broadcast => write!(f, "*:*"),
            Address::Shard(shard) => write!(f, "*:{shard}"),
            Address::Worker(slot) => write!(f, "{slot}:*"),
        }
    }
}
