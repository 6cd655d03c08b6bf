//! Striding Shard Partitioner
//!
//! Splits a contiguous shard range into one ordered shard list per worker slot.
//!
//! Properties:
//! - Full disjoint cover: every shard in the range lands in exactly one group
//! - Balanced: group sizes differ by at most one, lower slots take the extras
//! - Deterministic: group contents and their order depend only on the inputs
//!
//! Each round takes every `stride`-th shard of what is left, starting with a
//! stride equal to the worker count and shrinking it by one per round:
//!
//! ```text
//! workers = 3, range = 0..=7
//!
//! round 0, stride 3: [0 1 2 3 4 5 6 7] -> [0 3 6]
//! round 1, stride 2: [1 2 4 5 7]       -> [1 4 7]
//! round 2, stride 1: [2 5]             -> [2 5]
//! ```

use crate::error::ConfigError;
use crate::{ShardId, WorkerSlot};
use serde::Serialize;

/// Closed shard ID range `[first, last]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShardRange {
    pub first: ShardId,
    pub last: ShardId,
}

impl ShardRange {
    pub fn new(first: ShardId, last: ShardId) -> Result<Self, ConfigError> {
        if first > last {
            return Err(ConfigError::InvalidShardRange { first, last });
        }
        Ok(Self { first, last })
    }
}

/// Compute the per-worker shard groups for `[first, last]`.
pub fn partition(
    first: ShardId,
    last: ShardId,
    workers: usize,
) -> Result<Vec<Vec<ShardId>>, ConfigError> {
    if workers == 0 {
        return Err(ConfigError::InvalidWorkerCount);
    }
    let range = ShardRange::new(first, last)?;

    let mut remaining: Vec<ShardId> = (range.first..=range.last).collect();
    let mut groups = Vec::with_capacity(workers);

    for round in 0..workers {
        let stride = workers - round;
        let taken = remaining.len().div_ceil(stride);
        let mut group = Vec::with_capacity(taken);
        let mut rest = Vec::with_capacity(remaining.len() - taken);

        for (idx, shard) in remaining.into_iter().enumerate() {
            if idx % stride == 0 {
                group.push(shard);
            } else {
                rest.push(shard);
            }
        }

        groups.push(group);
        remaining = rest;
    }

    debug_assert!(remaining.is_empty());
    Ok(groups)
}

/// Immutable slot-to-shards assignment computed once at startup.
#[derive(Debug, Clone)]
pub struct Partition {
    range: ShardRange,
    groups: Vec<Vec<ShardId>>,
}

impl Partition {
    pub fn new(first: ShardId, last: ShardId, workers: usize) -> Result<Self, ConfigError> {
        let groups = partition(first, last, workers)?;
        Ok(Self {
            range: ShardRange { first, last },
            groups,
        })
    }

    /// Shards owned by `slot`.
    ///
    /// Slots past the configured worker count own nothing.
    pub fn shards_for(&self, slot: WorkerSlot) -> &[ShardId] {
        self.groups.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Configured worker count.
    pub fn workers(&self) -> usize {
        self.groups.len()
    }

    pub fn range(&self) -> ShardRange {
        self.range
    }

    pub fn groups(&self) -> &[Vec<ShardId>] {
        &self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_three_workers_eight_shards() {
        let groups = partition(0, 7, 3).unwrap();
        assert_eq!(groups, vec![vec![0, 3, 6], vec![1, 4, 7], vec![2, 5]]);
    }

    #[test]
    fn test_single_worker_owns_all_in_order() {
        let groups = partition(10, 15, 1).unwrap();
        assert_eq!(groups, vec![vec![10, 11, 12, 13, 14, 15]]);
    }

    #[test]
    fn test_more_workers_than_shards() {
        let groups = partition(0, 1, 4).unwrap();
        assert_eq!(groups, vec![vec![0], vec![1], vec![], vec![]]);
    }

    #[test]
    fn test_single_shard_range() {
        let groups = partition(5, 5, 2).unwrap();
        assert_eq!(groups, vec![vec![5], vec![]]);
    }

    #[test]
    fn test_negative_range() {
        let groups = partition(-3, 2, 2).unwrap();
        assert_eq!(groups, vec![vec![-3, -1, 1], vec![-2, 0, 2]]);
    }

    #[test]
    fn test_rejects_zero_workers() {
        assert_eq!(partition(0, 7, 0), Err(ConfigError::InvalidWorkerCount));
    }

    #[test]
    fn test_rejects_inverted_range() {
        assert_eq!(
            partition(8, 7, 2),
            Err(ConfigError::InvalidShardRange { first: 8, last: 7 })
        );
    }

    #[test]
    fn test_full_disjoint_cover() {
        for workers in 1..=12 {
            for first in -4..=4 {
                for last in first..first + 40 {
                    let groups = partition(first, last, workers).unwrap();
                    assert_eq!(groups.len(), workers);

                    let total: usize = groups.iter().map(Vec::len).sum();
                    let seen: BTreeSet<ShardId> = groups.iter().flatten().copied().collect();
                    let expected: BTreeSet<ShardId> = (first..=last).collect();

                    assert_eq!(total, expected.len(), "duplicates for {first}..={last}/{workers}");
                    assert_eq!(seen, expected, "omissions for {first}..={last}/{workers}");
                }
            }
        }
    }

    #[test]
    fn test_balanced_with_extras_first() {
        for workers in 1..=12 {
            for last in 0..60 {
                let groups = partition(0, last, workers).unwrap();
                let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
                let max = *sizes.iter().max().unwrap();
                let min = *sizes.iter().min().unwrap();
                assert!(max - min <= 1, "sizes {sizes:?}");
                assert!(
                    sizes.windows(2).all(|w| w[0] >= w[1]),
                    "extras must go to lower slots: {sizes:?}"
                );
            }
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(partition(3, 101, 7).unwrap(), partition(3, 101, 7).unwrap());
    }

    #[test]
    fn test_shards_for_beyond_configured_slots() {
        let partition = Partition::new(0, 7, 3).unwrap();
        assert_eq!(partition.shards_for(0), &[0, 3, 6]);
        assert_eq!(partition.shards_for(2), &[2, 5]);
        assert!(partition.shards_for(3).is_empty());
        assert_eq!(partition.workers(), 3);
        assert_eq!(partition.range(), ShardRange { first: 0, last: 7 });
    }
}
