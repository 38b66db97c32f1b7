//! Orphan ancestry resolution.

use crate::error::CheckpointError;
use crate::state::SharedCheckpointState;
use cps_core::{OrphanBlock, OrphanPool};
use cps_crypto::Hash256;

/// Follow parent links through the orphan pool and return the first
/// ancestor hash that is not itself an orphan: the block to request next.
///
/// The walk is bounded by the pool size; exceeding it means the pool holds
/// a cycle.
pub fn root_of_orphan(pool: &dyn OrphanPool, orphan: &OrphanBlock) -> Result<Hash256, CheckpointError> {
    let limit = pool.orphan_count() + 1;
    let mut wanted = orphan.prev_hash;
    let mut steps = 0usize;

    while let Some(parent) = pool.orphan(&wanted) {
        steps += 1;
        if steps > limit {
            log::error!(
                "Orphan ancestry of {} loops after {} steps; abandoning resolution",
                orphan.hash.short(),
                limit
            );
            return Err(CheckpointError::OrphanCycle {
                start: orphan.hash,
                limit,
            });
        }
        wanted = parent.prev_hash;
    }
    Ok(wanted)
}

/// True if `hash` is the target of the held pending checkpoint.
pub fn wanted_by_pending(state: &SharedCheckpointState, hash: &Hash256) -> bool {
    state.pending_hash().as_ref() == Some(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn h(n: u8) -> Hash256 {
        Hash256([n; 32])
    }

    fn pool_chain(len: u8) -> HashMap<Hash256, OrphanBlock> {
        // h(1) <- h(2) <- ... <- h(len); parent of h(1) is h(100) (unknown)
        let mut pool = HashMap::new();
        for i in 1..=len {
            let prev = if i == 1 { h(100) } else { h(i - 1) };
            pool.insert(h(i), OrphanBlock { hash: h(i), prev_hash: prev });
        }
        pool
    }

    #[test]
    fn test_root_of_chain() {
        let pool = pool_chain(10);
        let tip = pool[&h(10)];
        assert_eq!(root_of_orphan(&pool, &tip).unwrap(), h(100));
    }

    #[test]
    fn test_orphan_not_in_pool() {
        let pool = pool_chain(3);
        let fresh = OrphanBlock { hash: h(50), prev_hash: h(3) };
        assert_eq!(root_of_orphan(&pool, &fresh).unwrap(), h(100));

        let lonely = OrphanBlock { hash: h(51), prev_hash: h(77) };
        assert_eq!(root_of_orphan(&pool, &lonely).unwrap(), h(77));
    }

    #[test]
    fn test_cycle_detected() {
        let mut pool = pool_chain(5);
        // h(1) now points at h(5): 1 <- 2 <- ... <- 5 <- 1
        pool.insert(h(1), OrphanBlock { hash: h(1), prev_hash: h(5) });
        let result = root_of_orphan(&pool, &pool[&h(3)]);
        assert!(matches!(result, Err(CheckpointError::OrphanCycle { .. })));
    }

    #[test]
    fn test_self_loop_detected() {
        let mut pool = HashMap::new();
        pool.insert(h(1), OrphanBlock { hash: h(1), prev_hash: h(1) });
        assert!(root_of_orphan(&pool, &pool[&h(1)]).is_err());
    }

    #[test]
    fn test_wanted_by_pending() {
        use crate::testutil::signed;
        let state = SharedCheckpointState::default();
        assert!(!wanted_by_pending(&state, &h(4)));
        state.lock().pending = Some(signed(h(4)));
        assert!(wanted_by_pending(&state, &h(4)));
        assert!(!wanted_by_pending(&state, &h(5)));
    }
}
