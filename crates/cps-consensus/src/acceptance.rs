// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CHECKPOINT SYNC (CPS) - ACCEPTANCE ENGINE
//
// Drives CheckpointState through pending -> accepted -> invalid.
//
// Rules:
// 1. Signature is verified before anything else is looked at
// 2. Unknown target: held as the (single) pending message
// 3. Known target off the active chain, or diverging from the current
//    sync-checkpoint: cached as invalid, operator warning raised
// 4. Known target at or below the current sync-checkpoint on its lineage:
//    ignored (duplicate / regression)
// 5. Otherwise: becomes the new sync-checkpoint
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::authority::SignatureAuthority;
use crate::error::CheckpointError;
use crate::message::SyncCheckpoint;
use crate::state::{CheckpointState, SharedCheckpointState};
use cps_core::{
    unix_now, BlockIndex, ChainView, CheckpointConfig, CHECKPOINT_MAX_SPAN,
    DEFAULT_MATURE_AGE_SECS, DEFAULT_MATURITY_DEPTH,
};
use cps_crypto::Hash256;
use log::{debug, info, warn};

pub const CONFLICT_WARNING: &str =
    "WARNING: checkpoint on different blockchain fork, contact developers to resolve the issue";

pub const STALE_WARNING: &str =
    "WARNING: checkpoint is too old. Wait for block chain to download, or notify developers.";

/// Tunables for selection and maturity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointParams {
    /// Confirmations under the tip before a block may be checkpointed / is mature
    pub maturity_depth: u64,
    /// Checkpoint age after which it counts as mature regardless of depth
    pub mature_age_secs: u64,
    /// Max distance between a candidate's timestamp and the tip's
    pub max_span_secs: u64,
}

impl Default for CheckpointParams {
    fn default() -> Self {
        Self {
            maturity_depth: DEFAULT_MATURITY_DEPTH,
            mature_age_secs: DEFAULT_MATURE_AGE_SECS,
            max_span_secs: CHECKPOINT_MAX_SPAN,
        }
    }
}

impl From<&CheckpointConfig> for CheckpointParams {
    fn from(config: &CheckpointConfig) -> Self {
        Self {
            maturity_depth: config.maturity_depth,
            mature_age_secs: config.mature_age_secs,
            max_span_secs: config.max_span_secs,
        }
    }
}

/// Non-error result of processing a verified checkpoint message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Now the binding sync-checkpoint; persist and relay
    Accepted(Hash256),
    /// Target block unknown; held as pending, ancestors should be fetched
    Pending(Hash256),
    /// Duplicate, or an ancestor of the current sync-checkpoint
    Ignored(Hash256),
}

impl ProcessOutcome {
    pub fn hash(&self) -> Hash256 {
        match self {
            ProcessOutcome::Accepted(h) | ProcessOutcome::Pending(h) | ProcessOutcome::Ignored(h) => *h,
        }
    }
}

/// Position of a received target relative to the current sync-checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lineage {
    Descendant,
    NotNewer,
    Conflicting,
}

#[derive(Debug)]
pub struct AcceptanceEngine {
    authority: SignatureAuthority,
    params: CheckpointParams,
}

impl AcceptanceEngine {
    pub fn new(authority: SignatureAuthority, params: CheckpointParams) -> Self {
        Self { authority, params }
    }

    pub fn authority(&self) -> &SignatureAuthority {
        &self.authority
    }

    pub fn authority_mut(&mut self) -> &mut SignatureAuthority {
        &mut self.authority
    }

    pub fn params(&self) -> &CheckpointParams {
        &self.params
    }

    /// Entry point for a received (or locally signed) checkpoint message.
    pub fn process_incoming(
        &self,
        state: &SharedCheckpointState,
        chain: &dyn ChainView,
        checkpoint: &SyncCheckpoint,
    ) -> Result<ProcessOutcome, CheckpointError> {
        let hash = checkpoint.hash_checkpoint();
        if !self.authority.verify(checkpoint) {
            warn!("ProcessSyncCheckpoint: bad signature for {}", hash.short());
            return Err(CheckpointError::InvalidSignature);
        }
        if checkpoint.is_null() {
            return Err(CheckpointError::Malformed(
                "null checkpoint hash".to_string(),
            ));
        }

        let mut st = state.lock();
        if st.hash_invalid_checkpoint == Some(hash) {
            debug!("ProcessSyncCheckpoint: {} already known invalid", hash.short());
            return Err(CheckpointError::ConflictingFork { hash });
        }

        if !chain.contains(&hash) {
            if let Some(old) = st.pending_hash() {
                if old != hash {
                    debug!("ProcessSyncCheckpoint: pending {} superseded", old.short());
                }
            }
            st.pending = Some(checkpoint.clone());
            info!("ProcessSyncCheckpoint: pending for sync-checkpoint {}", hash);
            return Ok(ProcessOutcome::Pending(hash));
        }

        self.accept_locked(&mut st, chain, checkpoint)
    }

    /// Retry the held pending message. Returns true if it became the
    /// sync-checkpoint.
    ///
    /// A pending target that is known but not yet on the active chain stays
    /// pending until a reorganization connects it.
    pub fn accept_pending(
        &self,
        state: &SharedCheckpointState,
        chain: &dyn ChainView,
    ) -> Result<bool, CheckpointError> {
        let mut st = state.lock();
        let pending = match st.pending.clone() {
            Some(p) => p,
            None => return Ok(false),
        };
        let hash = pending.hash_checkpoint();
        if !chain.contains(&hash) || !chain.is_in_main_chain(&hash) {
            return Ok(false);
        }

        match self.accept_locked(&mut st, chain, &pending)? {
            ProcessOutcome::Accepted(_) => Ok(true),
            ProcessOutcome::Ignored(_) => {
                st.pending = None;
                Ok(false)
            }
            ProcessOutcome::Pending(_) => Ok(false),
        }
    }

    fn accept_locked(
        &self,
        st: &mut CheckpointState,
        chain: &dyn ChainView,
        checkpoint: &SyncCheckpoint,
    ) -> Result<ProcessOutcome, CheckpointError> {
        let hash = checkpoint.hash_checkpoint();
        let received = match chain.block_index(&hash) {
            Some(b) => b,
            None => {
                st.pending = Some(checkpoint.clone());
                return Ok(ProcessOutcome::Pending(hash));
            }
        };

        match Self::lineage(st, chain, &received) {
            Lineage::NotNewer => {
                debug!(
                    "ProcessSyncCheckpoint: {} is not newer than current sync-checkpoint",
                    hash.short()
                );
                if st.pending_hash() == Some(hash) {
                    st.pending = None;
                }
                return Ok(ProcessOutcome::Ignored(hash));
            }
            Lineage::Conflicting => {
                return Err(Self::mark_invalid(
                    st,
                    hash,
                    "conflicts with current sync-checkpoint",
                ));
            }
            Lineage::Descendant => {}
        }

        if !chain.is_in_main_chain(&hash) {
            return Err(Self::mark_invalid(st, hash, "not on the active chain"));
        }

        st.hash_sync_checkpoint = hash;
        st.checkpoint_message = Some(checkpoint.clone());
        if st.pending_hash() == Some(hash) {
            st.pending = None;
        }
        if st.hash_invalid_checkpoint == Some(hash) {
            st.hash_invalid_checkpoint = None;
        }
        info!(
            "ProcessSyncCheckpoint: sync-checkpoint at {} (height {})",
            hash, received.height
        );
        Ok(ProcessOutcome::Accepted(hash))
    }

    /// Where does `received` sit relative to the current sync-checkpoint?
    fn lineage(st: &CheckpointState, chain: &dyn ChainView, received: &BlockIndex) -> Lineage {
        if st.hash_sync_checkpoint.is_zero() {
            return Lineage::Descendant;
        }
        let current = match chain.block_index(&st.hash_sync_checkpoint) {
            Some(b) => b,
            None => {
                warn!(
                    "ValidateSyncCheckpoint: current sync-checkpoint {} not in block index",
                    st.hash_sync_checkpoint.short()
                );
                return Lineage::Descendant;
            }
        };

        if received.height <= current.height {
            // Must be on the current checkpoint's own lineage
            match chain.ancestor_at(&current, received.height) {
                Some(a) if a.hash == received.hash => Lineage::NotNewer,
                _ => Lineage::Conflicting,
            }
        } else {
            match chain.ancestor_at(received, current.height) {
                Some(a) if a.hash == current.hash => Lineage::Descendant,
                _ => Lineage::Conflicting,
            }
        }
    }

    fn mark_invalid(st: &mut CheckpointState, hash: Hash256, reason: &str) -> CheckpointError {
        warn!("ValidateSyncCheckpoint: checkpoint {} {}", hash, reason);
        st.hash_invalid_checkpoint = Some(hash);
        st.warning = CONFLICT_WARNING.to_string();
        if st.pending_hash() == Some(hash) {
            st.pending = None;
        }
        CheckpointError::ConflictingFork { hash }
    }

    /// Next checkpoint candidate: the deepest block at least
    /// `maturity_depth` under the tip whose timestamp is within
    /// `max_span_secs` of the tip's (boundary inclusive). Zero if none.
    pub fn auto_select(&self, chain: &dyn ChainView) -> Hash256 {
        let tip = match chain.tip() {
            Some(t) => t,
            None => return Hash256::ZERO,
        };
        let earliest = tip.time.saturating_sub(self.params.max_span_secs);

        let mut selected = Hash256::ZERO;
        let mut cursor = Some(tip);
        while let Some(block) = cursor {
            if block.time < earliest {
                break;
            }
            if tip.height - block.height >= self.params.maturity_depth {
                selected = block.hash;
            }
            if block.height == 0 {
                break;
            }
            cursor = chain.block_index(&block.prev_hash);
        }
        selected
    }

    /// Drop the pending message and the cached invalid hash.
    pub fn reset(&self, state: &SharedCheckpointState) {
        let mut st = state.lock();
        st.pending = None;
        st.hash_invalid_checkpoint = None;
        info!("Checkpoint state reset (pending and invalid cleared)");
    }

    pub fn is_mature(&self, state: &SharedCheckpointState, chain: &dyn ChainView) -> bool {
        self.is_mature_at(state, chain, unix_now())
    }

    /// Deep enough under the tip, or old enough, to be treated as settled.
    pub fn is_mature_at(
        &self,
        state: &SharedCheckpointState,
        chain: &dyn ChainView,
        now: u64,
    ) -> bool {
        let hash = state.accepted_hash();
        if hash.is_zero() {
            return false;
        }
        let (block, tip) = match (chain.block_index(&hash), chain.tip()) {
            (Some(b), Some(t)) => (b, t),
            _ => return false,
        };
        tip.height.saturating_sub(block.height) >= self.params.maturity_depth
            || now.saturating_sub(block.time) >= self.params.mature_age_secs
    }

    pub fn is_too_old(
        &self,
        state: &SharedCheckpointState,
        chain: &dyn ChainView,
        threshold_secs: u64,
    ) -> bool {
        self.is_too_old_at(state, chain, threshold_secs, unix_now())
    }

    /// `now - acceptedBlockTime > threshold_secs`. False without a
    /// resolvable checkpoint.
    pub fn is_too_old_at(
        &self,
        state: &SharedCheckpointState,
        chain: &dyn ChainView,
        threshold_secs: u64,
        now: u64,
    ) -> bool {
        let hash = state.accepted_hash();
        if hash.is_zero() {
            return false;
        }
        match chain.block_index(&hash) {
            Some(block) => now.saturating_sub(block.time) > threshold_secs,
            None => false,
        }
    }
}
