// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CHECKPOINT SYNC (CPS) - NODE SERVICE
//
// Runtime context owning the checkpoint state and wiring it to the chain,
// orphan pool, peer transport and durable store.
//
// Lock rule: CheckpointState is locked only inside AcceptanceEngine /
// enforcement calls. Store writes and relays happen after those return.
// Store writes are serialized by their own mutex (taken before, never
// inside, the state lock) and always write the current accepted hash.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::status::CheckpointStatus;
use cps_consensus::{
    check_candidate, root_of_orphan, wanted_by_pending, AcceptanceEngine, CheckpointError,
    CheckpointParams, CheckpointState, CheckpointStore, ProcessOutcome, SharedCheckpointState,
    SignatureAuthority, SledCheckpointStore, SyncCheckpoint, STALE_WARNING,
};
use cps_core::{
    unix_now, BlockIndex, ChainView, CheckpointConfig, Hash256, Network, OrphanBlock, OrphanPool,
    PeerId,
};
use cps_network::{PeerTransport, RelayProtocol};
use log::{error, info, warn};
use std::sync::{Arc, Mutex};

/// Wire command handled by [`SyncCheckpointService::process_message`]
pub const CHECKPOINT_COMMAND: &str = "checkpoint";

/// Misbehavior score for a badly signed checkpoint
pub const INVALID_SIGNATURE_PENALTY: u32 = 100;

pub struct SyncCheckpointService {
    network: Network,
    stale_warning_secs: u64,
    state: SharedCheckpointState,
    engine: AcceptanceEngine,
    relay: RelayProtocol,
    chain: Arc<dyn ChainView>,
    orphans: Arc<dyn OrphanPool>,
    transport: Arc<dyn PeerTransport>,
    store: Arc<dyn CheckpointStore>,
    writes: Mutex<DeferredWrites>,
}

/// Durable records whose last write failed
#[derive(Debug, Default)]
struct DeferredWrites {
    checkpoint: Option<Hash256>,
    pubkey: Option<Vec<u8>>,
}

impl DeferredWrites {
    fn is_empty(&self) -> bool {
        self.checkpoint.is_none() && self.pubkey.is_none()
    }
}

impl SyncCheckpointService {
    /// Build the service at node startup.
    ///
    /// Fails only if the compiled master key is unusable or the stored
    /// checkpoint cannot be read. A bad or mismatched private key is logged
    /// and the node runs verify-only.
    pub fn open(
        config: &CheckpointConfig,
        chain: Arc<dyn ChainView>,
        orphans: Arc<dyn OrphanPool>,
        transport: Arc<dyn PeerTransport>,
        store: Arc<dyn CheckpointStore>,
    ) -> Result<Self, CheckpointError> {
        let mut authority = SignatureAuthority::for_network(config.network)?;
        if let Some(key) = config.master_private_key.as_deref() {
            if let Err(e) = authority.set_private_key(key) {
                warn!("Checkpoint master key not loaded, running verify-only: {}", e);
            }
        }

        let accepted = store.read_sync_checkpoint()?.unwrap_or(Hash256::ZERO);
        let service = Self {
            network: config.network,
            stale_warning_secs: config.stale_warning_secs,
            state: SharedCheckpointState::new(CheckpointState::new(accepted, config.enforce)),
            engine: AcceptanceEngine::new(authority, CheckpointParams::from(config)),
            relay: RelayProtocol::new(),
            chain,
            orphans,
            transport,
            store,
            writes: Mutex::new(DeferredWrites::default()),
        };

        service.check_checkpoint_pubkey()?;
        info!(
            "Sync-checkpoint service started: network={}, checkpoint={}, enforce={}, authority={}",
            service.network,
            service.state.accepted_hash().short(),
            config.enforce,
            service.engine.authority().is_authority()
        );
        Ok(service)
    }

    /// [`open`](Self::open) with a sled store at `config.db_path`.
    pub fn open_with_sled(
        config: &CheckpointConfig,
        chain: Arc<dyn ChainView>,
        orphans: Arc<dyn OrphanPool>,
        transport: Arc<dyn PeerTransport>,
    ) -> Result<Self, CheckpointError> {
        let store = Arc::new(SledCheckpointStore::open(&config.db_path)?);
        Self::open(config, chain, orphans, transport, store)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn state(&self) -> &SharedCheckpointState {
        &self.state
    }

    pub fn engine(&self) -> &AcceptanceEngine {
        &self.engine
    }

    pub fn relay(&self) -> &RelayProtocol {
        &self.relay
    }

    pub fn accepted_hash(&self) -> Hash256 {
        self.state.accepted_hash()
    }

    // ─────────────────────────────────────────────────────────────
    // Startup
    // ─────────────────────────────────────────────────────────────

    /// Compare the stored master key with the active one. On first run or
    /// after a key change, record the new key and reset the checkpoint to
    /// genesis. Returns true if a reset happened.
    pub fn check_checkpoint_pubkey(&self) -> Result<bool, CheckpointError> {
        let active = self.engine.authority().public_key().to_bytes();
        if let Some(stored) = self.store.read_checkpoint_pubkey()? {
            if stored == active {
                return Ok(false);
            }
        }

        let genesis = self.chain.genesis().map(|g| g.hash).unwrap_or(Hash256::ZERO);
        {
            let mut st = self.state.lock();
            st.hash_sync_checkpoint = genesis;
            st.checkpoint_message = None;
            st.pending = None;
            st.hash_invalid_checkpoint = None;
        }
        info!(
            "Checkpoint master key changed or first run; sync-checkpoint reset to {}",
            genesis.short()
        );

        // Key record goes after the reset checkpoint, so a crash in between
        // repeats the reset on next start
        let mut writes = self.lock_writes();
        writes.pubkey = Some(active.to_vec());
        if let Err(e) = self.write_through(&mut writes) {
            error!("Failed to persist checkpoint key rotation, will retry on flush: {}", e);
        }
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────
    // Inbound
    // ─────────────────────────────────────────────────────────────

    /// Handle a `checkpoint` payload received from `peer`.
    pub fn process_message(
        &self,
        peer: &PeerId,
        payload: &[u8],
    ) -> Result<ProcessOutcome, CheckpointError> {
        let checkpoint = SyncCheckpoint::from_wire(payload).map_err(|e| {
            warn!("Malformed checkpoint message from {}: {}", peer, e);
            e
        })?;
        self.process_checkpoint(Some(peer), &checkpoint)
    }

    fn process_checkpoint(
        &self,
        source: Option<&PeerId>,
        checkpoint: &SyncCheckpoint,
    ) -> Result<ProcessOutcome, CheckpointError> {
        let outcome = match self.engine.process_incoming(&self.state, &*self.chain, checkpoint) {
            Ok(outcome) => outcome,
            Err(CheckpointError::InvalidSignature) => {
                if let Some(peer) = source {
                    self.transport.misbehaving(peer, INVALID_SIGNATURE_PENALTY);
                }
                return Err(CheckpointError::InvalidSignature);
            }
            Err(e) => return Err(e),
        };

        match outcome {
            ProcessOutcome::Accepted(hash) => {
                if let Some(peer) = source {
                    self.relay.mark_known(peer, hash);
                }
                self.persist();
                self.relay.broadcast(&*self.transport, checkpoint);
            }
            ProcessOutcome::Pending(_) => {
                self.ask_for_pending(source);
            }
            ProcessOutcome::Ignored(_) => {}
        }
        Ok(outcome)
    }

    /// Retry the pending checkpoint; call after every connected block.
    pub fn accept_pending(&self) -> Result<bool, CheckpointError> {
        if !self.engine.accept_pending(&self.state, &*self.chain)? {
            return Ok(false);
        }
        self.persist();
        if let Some(message) = self.state.checkpoint_message() {
            self.relay.broadcast(&*self.transport, &message);
        }
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────
    // Authority
    // ─────────────────────────────────────────────────────────────

    /// Sign a checkpoint for `hash`, accept it locally and broadcast it.
    pub fn send_sync_checkpoint(&self, hash: Hash256) -> Result<(), CheckpointError> {
        let mut checkpoint = SyncCheckpoint::new_unsigned(hash)?;
        self.engine.authority().sign(&mut checkpoint)?;

        match self.process_checkpoint(None, &checkpoint)? {
            ProcessOutcome::Accepted(_) => {
                info!("Sent sync-checkpoint {}", hash);
                Ok(())
            }
            ProcessOutcome::Pending(_) => Err(CheckpointError::NotAccepted {
                hash,
                reason: "target block unknown".to_string(),
            }),
            ProcessOutcome::Ignored(_) => Err(CheckpointError::NotAccepted {
                hash,
                reason: "not newer than the current sync-checkpoint".to_string(),
            }),
        }
    }

    /// Authority only: checkpoint the auto-selected block if it advances the
    /// current one. Returns the hash sent, if any.
    pub fn auto_send(&self) -> Result<Option<Hash256>, CheckpointError> {
        if !self.engine.authority().is_authority() {
            return Ok(None);
        }
        let selected = self.engine.auto_select(&*self.chain);
        if selected.is_zero() {
            return Ok(None);
        }

        let accepted = self.state.accepted_hash();
        if let (Some(current), Some(candidate)) =
            (self.chain.block_index(&accepted), self.chain.block_index(&selected))
        {
            if candidate.height <= current.height {
                return Ok(None);
            }
        }

        self.send_sync_checkpoint(selected)?;
        Ok(Some(selected))
    }

    // ─────────────────────────────────────────────────────────────
    // Block validation / orphans
    // ─────────────────────────────────────────────────────────────

    /// Enforcement gate for a candidate block with parent `prev`.
    pub fn check_candidate(&self, block_hash: &Hash256, prev: Option<&BlockIndex>) -> bool {
        check_candidate(&self.state, &*self.chain, block_hash, prev)
    }

    /// Request whatever is needed to resolve the pending checkpoint from
    /// `peer` (every peer when `None`). Returns the number of requests queued.
    pub fn ask_for_pending(&self, peer: Option<&PeerId>) -> usize {
        let pending = match self.state.pending_hash() {
            Some(h) => h,
            None => return 0,
        };
        if self.chain.contains(&pending) {
            return 0;
        }

        let wanted = match self.orphans.orphan(&pending) {
            Some(orphan) => match root_of_orphan(&*self.orphans, &orphan) {
                Ok(root) => root,
                Err(e) => {
                    error!("AskForPendingSyncCheckpoint: {}", e);
                    return 0;
                }
            },
            None => pending,
        };
        self.relay.request_ancestors(&*self.transport, peer, &wanted)
    }

    /// Request the missing root of an orphan received from `peer`. When the
    /// orphan is the pending checkpoint's target every peer is asked.
    pub fn on_orphan_block(&self, peer: &PeerId, orphan: &OrphanBlock) -> Result<usize, CheckpointError> {
        let root = root_of_orphan(&*self.orphans, orphan)?;
        let target = if wanted_by_pending(&self.state, &orphan.hash) {
            None
        } else {
            Some(peer)
        };
        Ok(self.relay.request_ancestors(&*self.transport, target, &root))
    }

    // ─────────────────────────────────────────────────────────────
    // Peers
    // ─────────────────────────────────────────────────────────────

    /// Relay the current checkpoint to a newly connected peer.
    pub fn on_peer_connected(&self, peer: &PeerId) -> bool {
        let message = match self.state.checkpoint_message() {
            Some(m) => m,
            None => return false,
        };
        match self.relay.relay_to(&*self.transport, peer, &message) {
            Ok(sent) => sent,
            Err(e) => {
                warn!("Relay of sync-checkpoint to new peer {} failed: {}", peer, e);
                false
            }
        }
    }

    pub fn on_peer_disconnected(&self, peer: &PeerId) {
        self.relay.forget_peer(peer);
    }

    // ─────────────────────────────────────────────────────────────
    // Operator surface
    // ─────────────────────────────────────────────────────────────

    pub fn reset(&self) {
        self.engine.reset(&self.state);
    }

    pub fn set_enforce(&self, enforce: bool) {
        self.state.set_enforce(enforce);
        info!("Checkpoint enforcement {}", if enforce { "enabled" } else { "disabled" });
    }

    pub fn is_enforced(&self) -> bool {
        self.state.is_enforced()
    }

    /// Raise the stale-authority warning if the checkpoint is older than
    /// `threshold_secs`. Enforcement is left as is.
    pub fn poll_staleness(&self, threshold_secs: u64) -> bool {
        self.poll_staleness_at(threshold_secs, unix_now())
    }

    pub fn poll_staleness_at(&self, threshold_secs: u64, now: u64) -> bool {
        if !self
            .engine
            .is_too_old_at(&self.state, &*self.chain, threshold_secs, now)
        {
            return false;
        }
        warn!(
            "Sync-checkpoint {} is older than {}s; checkpoint authority may be offline",
            self.state.accepted_hash().short(),
            threshold_secs
        );
        self.state.set_warning(STALE_WARNING);
        true
    }

    /// Retry failed durable writes. Returns true if something was written.
    pub fn flush(&self) -> Result<bool, CheckpointError> {
        let mut writes = self.lock_writes();
        if writes.is_empty() {
            return Ok(false);
        }
        self.write_through(&mut writes)?;
        info!("Flushed sync-checkpoint {}", self.state.accepted_hash().short());
        Ok(true)
    }

    pub fn has_unflushed(&self) -> bool {
        !self.lock_writes().is_empty()
    }

    pub fn status(&self) -> CheckpointStatus {
        self.status_at(unix_now())
    }

    pub fn status_at(&self, now: u64) -> CheckpointStatus {
        let snapshot = self.state.snapshot();
        let block = self.chain.block_index(&snapshot.hash_sync_checkpoint);
        CheckpointStatus {
            network: self.network,
            synccheckpoint: snapshot.hash_sync_checkpoint.to_hex(),
            height: block.map(|b| b.height),
            timestamp: block.map(|b| b.time),
            pending: snapshot.pending_hash().map(|h| h.to_hex()),
            invalid: snapshot.hash_invalid_checkpoint.map(|h| h.to_hex()),
            enforced: snapshot.enforce,
            warning: snapshot.warning,
            mature: self.engine.is_mature_at(&self.state, &*self.chain, now),
            too_old: self
                .engine
                .is_too_old_at(&self.state, &*self.chain, self.stale_warning_secs, now),
            authority: self.engine.authority().is_authority(),
            public_key: self.engine.authority().public_key().to_hex(),
        }
    }

    fn lock_writes(&self) -> std::sync::MutexGuard<'_, DeferredWrites> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Durable write outside the state lock; failure is kept for
    /// [`flush`](Self::flush).
    fn persist(&self) {
        let mut writes = self.lock_writes();
        if let Err(e) = self.write_through(&mut writes) {
            error!("Failed to persist sync-checkpoint: {}", e);
        }
    }

    /// Write the current accepted hash, then any deferred key record.
    /// Caller holds the write mutex, so writes land in acceptance order.
    fn write_through(&self, writes: &mut DeferredWrites) -> Result<(), CheckpointError> {
        let hash = self.state.accepted_hash();
        if let Err(e) = self.store.write_sync_checkpoint(&hash) {
            writes.checkpoint = Some(hash);
            return Err(e);
        }
        writes.checkpoint = None;

        if let Some(key) = writes.pubkey.take() {
            if let Err(e) = self.store.write_checkpoint_pubkey(&key) {
                writes.pubkey = Some(key);
                return Err(e);
            }
        }
        Ok(())
    }
}
