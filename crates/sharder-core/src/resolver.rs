//! Virtual Worker Resolution
//!
//! Maps a shard to the slot that receives `*:<shard>` messages. This is a
//! plain modulo over the worker count, offset by the first shard, and it is
//! independent of [`crate::partition`]: the resolved slot is a deterministic
//! routing target, not necessarily the slot that owns the shard.

use crate::{ShardId, WorkerSlot};

/// Returns the virtual worker slot for `shard`.
///
/// Computes `(shard - (first mod workers)) mod workers` with a non-negative
/// modulo. Returns slot 0 when `workers` is zero.
pub fn resolve_worker(shard: ShardId, first: ShardId, workers: usize) -> WorkerSlot {
    if workers == 0 {
        return 0;
    }
    // i128 keeps every intermediate in range for any i64 shard and usize count.
    let workers = workers as i128;
    let offset = (first as i128).rem_euclid(workers);
    ((shard as i128 - offset).rem_euclid(workers)) as WorkerSlot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_based_range() {
        let slots: Vec<_> = (0..8).map(|shard| resolve_worker(shard, 0, 3)).collect();
        assert_eq!(slots, vec![0, 1, 2, 0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_offset_range() {
        // first = 10, 10 mod 4 = 2
        assert_eq!(resolve_worker(10, 10, 4), 0);
        assert_eq!(resolve_worker(11, 10, 4), 1);
        assert_eq!(resolve_worker(13, 10, 4), 3);
        assert_eq!(resolve_worker(14, 10, 4), 0);
    }

    #[test]
    fn test_negative_inputs_stay_non_negative() {
        assert_eq!(resolve_worker(-1, 0, 3), 2);
        assert_eq!(resolve_worker(-5, -5, 3), 0);
        assert_eq!(resolve_worker(-4, -5, 3), 1);
    }

    #[test]
    fn test_extreme_values_do_not_overflow() {
        assert!(resolve_worker(i64::MIN, i64::MAX, 7) < 7);
        assert!(resolve_worker(i64::MAX, i64::MIN, 7) < 7);
    }

    #[test]
    fn test_always_in_range_and_deterministic() {
        for workers in 1..10 {
            for first in -20..20 {
                for shard in first..first + 50 {
                    let slot = resolve_worker(shard, first, workers);
                    assert!(slot < workers);
                    assert_eq!(slot, resolve_worker(shard, first, workers));
                }
            }
        }
    }

    #[test]
    fn test_zero_workers() {
        assert_eq!(resolve_worker(42, 0, 0), 0);
    }
}
