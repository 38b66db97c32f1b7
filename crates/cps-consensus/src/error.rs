use cps_core::Network;
use cps_crypto::{CryptoError, Hash256};

/// Failure modes of the checkpoint subsystem.
///
/// None of these is fatal to the node: each degrades to "drop this
/// message", "reject this block", "warn", or "stay verify-only".
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Wire payload could not be decoded (truncated, overlong, trailing bytes)
    #[error("Malformed checkpoint message: {0}")]
    Malformed(String),

    /// Signature does not verify against the active master key
    #[error("Checkpoint signature verification failed")]
    InvalidSignature,

    /// Target block is off the active chain or conflicts with the current sync-checkpoint
    #[error("Checkpoint {hash} is on a conflicting fork")]
    ConflictingFork { hash: Hash256 },

    /// Sign requested on a node without a master private key
    #[error("Cannot sign checkpoint: {0}")]
    Signing(String),

    #[error("Private key does not match the {network} checkpoint master key")]
    KeyMismatch { network: Network },

    /// Compiled master public key is empty or malformed (startup only)
    #[error("Checkpoint master public key for {network} is invalid: {source}")]
    InvalidPublicKey {
        network: Network,
        #[source]
        source: CryptoError,
    },

    #[error("Invalid checkpoint private key: {0}")]
    InvalidPrivateKey(#[from] CryptoError),

    /// Durable read/write of checkpoint records failed
    #[error("Checkpoint persistence failed: {0}")]
    Persistence(String),

    /// Locally signed checkpoint did not become the sync-checkpoint
    #[error("Checkpoint {hash} was not accepted: {reason}")]
    NotAccepted { hash: Hash256, reason: String },

    /// Orphan ancestry walk exceeded the pool size
    #[error("Orphan ancestry walk from {start} exceeded {limit} steps (cycle in orphan pool)")]
    OrphanCycle { start: Hash256, limit: usize },
}

impl From<sled::Error> for CheckpointError {
    fn from(e: sled::Error) -> Self {
        CheckpointError::Persistence(e.to_string())
    }
}

impl From<bincode::Error> for CheckpointError {
    fn from(e: bincode::Error) -> Self {
        CheckpointError::Malformed(e.to_string())
    }
}
