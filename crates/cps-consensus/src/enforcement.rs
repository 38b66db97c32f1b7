// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CHECKPOINT SYNC (CPS) - ENFORCEMENT GATE
//
// Consulted by block validation before a candidate is connected. With the
// sync-checkpoint at height H:
// - candidate above H: its ancestor at H must be the checkpoint
// - candidate at H:    must be the checkpoint
// - candidate below H: must be an ancestor of the checkpoint
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::state::SharedCheckpointState;
use cps_core::{BlockIndex, ChainView};
use cps_crypto::Hash256;
use log::warn;

/// Should block validation let this candidate through?
///
/// `prev` is the candidate's parent (`None` for a genesis candidate). When
/// enforcement is off a conflict only raises the operator warning.
pub fn check_candidate(
    state: &SharedCheckpointState,
    chain: &dyn ChainView,
    block_hash: &Hash256,
    prev: Option<&BlockIndex>,
) -> bool {
    let (accepted, enforce) = {
        let st = state.lock();
        (st.hash_sync_checkpoint, st.enforce)
    };

    if !accepted.is_zero() && !chain.contains(&accepted) {
        warn!(
            "CheckSyncCheckpoint: sync-checkpoint {} not in block index; enforcement inactive",
            accepted.short()
        );
        state.set_warning(format!(
            "WARNING: sync-checkpoint {} is not in the block index; checkpoint enforcement is inactive",
            accepted
        ));
        return true;
    }

    let violation = match find_violation(chain, &accepted, block_hash, prev) {
        Some(v) => v,
        None => return true,
    };

    if enforce {
        warn!("CheckSyncCheckpoint: rejecting block {}: {}", block_hash.short(), violation);
        false
    } else {
        warn!(
            "CheckSyncCheckpoint: block {} {} (enforcement off, accepting)",
            block_hash.short(),
            violation
        );
        state.set_warning(format!(
            "WARNING: block {} {}; checkpoint enforcement is disabled",
            block_hash, violation
        ));
        true
    }
}

/// Describe how a candidate conflicts with the `accepted` checkpoint, or
/// `None` if it does not.
///
/// A zero or unresolvable checkpoint never blocks anything.
pub fn find_violation(
    chain: &dyn ChainView,
    accepted: &Hash256,
    block_hash: &Hash256,
    prev: Option<&BlockIndex>,
) -> Option<String> {
    if accepted.is_zero() {
        return None;
    }
    let sync = chain.block_index(accepted)?;
    let height = prev.map(|p| p.height + 1).unwrap_or(0);

    if height > sync.height {
        // height > 0 here, so a parent exists
        let parent = match prev {
            Some(p) => p,
            None => return Some("has no parent".to_string()),
        };
        match chain.ancestor_at(parent, sync.height) {
            Some(a) if a.hash == *accepted => None,
            _ => Some(format!(
                "at height {} does not descend from sync-checkpoint {} at height {}",
                height,
                accepted.short(),
                sync.height
            )),
        }
    } else if height == sync.height {
        if block_hash == accepted {
            None
        } else {
            Some(format!(
                "at height {} differs from sync-checkpoint {}",
                height,
                accepted.short()
            ))
        }
    } else {
        match chain.ancestor_at(&sync, height) {
            Some(a) if a.hash == *block_hash => None,
            _ => Some(format!(
                "at height {} is not an ancestor of sync-checkpoint {}",
                height,
                accepted.short()
            )),
        }
    }
}
