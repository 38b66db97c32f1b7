//! Mutable checkpoint state shared by message processing, block validation
//! and the operator surface.
//!
//! One mutex guards all of it. Every operation takes the lock for a single
//! in-memory transition; persistence and network I/O happen outside.

use crate::message::SyncCheckpoint;
use cps_crypto::Hash256;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointState {
    /// Currently binding checkpoint, zero before the first acceptance
    pub hash_sync_checkpoint: Hash256,
    /// Signed message that produced `hash_sync_checkpoint`, relayed to new peers
    pub checkpoint_message: Option<SyncCheckpoint>,
    /// Verified message whose target block is not yet known
    pub pending: Option<SyncCheckpoint>,
    /// Checkpoint found to conflict with the chain
    pub hash_invalid_checkpoint: Option<Hash256>,
    pub enforce: bool,
    /// Operator-visible warning, empty when healthy
    pub warning: String,
}

impl CheckpointState {
    pub fn new(accepted: Hash256, enforce: bool) -> Self {
        Self {
            hash_sync_checkpoint: accepted,
            checkpoint_message: None,
            pending: None,
            hash_invalid_checkpoint: None,
            enforce,
            warning: String::new(),
        }
    }

    pub fn pending_hash(&self) -> Option<Hash256> {
        self.pending.as_ref().map(|p| p.hash_checkpoint())
    }
}

impl Default for CheckpointState {
    fn default() -> Self {
        Self::new(Hash256::ZERO, true)
    }
}

#[derive(Debug, Default)]
pub struct SharedCheckpointState {
    inner: Mutex<CheckpointState>,
}

impl SharedCheckpointState {
    pub fn new(state: CheckpointState) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    /// Lock the state, recovering from poisoning.
    pub fn lock(&self) -> MutexGuard<'_, CheckpointState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> CheckpointState {
        self.lock().clone()
    }

    pub fn accepted_hash(&self) -> Hash256 {
        self.lock().hash_sync_checkpoint
    }

    pub fn pending_hash(&self) -> Option<Hash256> {
        self.lock().pending_hash()
    }

    pub fn invalid_hash(&self) -> Option<Hash256> {
        self.lock().hash_invalid_checkpoint
    }

    pub fn checkpoint_message(&self) -> Option<SyncCheckpoint> {
        self.lock().checkpoint_message.clone()
    }

    pub fn is_enforced(&self) -> bool {
        self.lock().enforce
    }

    pub fn set_enforce(&self, enforce: bool) {
        self.lock().enforce = enforce;
    }

    pub fn warning(&self) -> String {
        self.lock().warning.clone()
    }

    pub fn set_warning(&self, warning: impl Into<String>) {
        self.lock().warning = warning.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cps_crypto::hash256;

    #[test]
    fn test_default_state() {
        let state = SharedCheckpointState::default();
        assert!(state.accepted_hash().is_zero());
        assert!(state.is_enforced());
        assert!(state.pending_hash().is_none());
        assert!(state.warning().is_empty());
    }

    #[test]
    fn test_enforce_toggle_and_warning() {
        let state = SharedCheckpointState::new(CheckpointState::new(hash256(b"a"), false));
        assert!(!state.is_enforced());
        state.set_enforce(true);
        assert!(state.is_enforced());

        state.set_warning("stale");
        assert_eq!(state.snapshot().warning, "stale");
    }

    #[test]
    fn test_poisoned_lock_recovers() {
        let state = std::sync::Arc::new(SharedCheckpointState::default());
        let clone = state.clone();
        let _ = std::thread::spawn(move || {
            let _guard = clone.lock();
            panic!("poison");
        })
        .join();

        state.set_enforce(false);
        assert!(!state.is_enforced());
    }
}
