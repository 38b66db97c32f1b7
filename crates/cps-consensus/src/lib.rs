// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CHECKPOINT SYNC (CPS) - CONSENSUS
//
// Synchronized checkpoints: a single master key signs block hashes that
// every node then treats as an irreversible point in the chain.
//
// Modules:
// - message:     `checkpoint` wire message and its exact signed bytes
// - authority:   master key selection, signing, verification
// - state:       mutex-guarded checkpoint state
// - acceptance:  pending -> accepted -> invalid transitions, auto-selection
// - enforcement: block validation gate
// - orphan:      orphan-pool ancestry walk
// - store:       durable accepted hash (sled)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod acceptance;
pub mod authority;
pub mod enforcement;
pub mod error;
pub mod message;
pub mod orphan;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use acceptance::{
    AcceptanceEngine, CheckpointParams, ProcessOutcome, CONFLICT_WARNING, STALE_WARNING,
};
pub use authority::{
    compiled_public_key, select_public_key, SignatureAuthority, CHECKPOINT_MAIN_PUBKEY,
    CHECKPOINT_TEST_PUBKEY,
};
pub use cps_core::CHECKPOINT_MAX_SPAN;
pub use enforcement::{check_candidate, find_violation};
pub use error::CheckpointError;
pub use message::{
    SyncCheckpoint, UnsignedCheckpoint, CHECKPOINT_VERSION, MAX_CHECKPOINT_MESSAGE_SIZE,
};
pub use orphan::{root_of_orphan, wanted_by_pending};
pub use state::{CheckpointState, SharedCheckpointState};
pub use store::{CheckpointStore, SledCheckpointStore};
