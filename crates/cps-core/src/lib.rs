// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CHECKPOINT SYNC (CPS) - CORE TYPES
//
// Shared vocabulary of the checkpoint subsystem.
// - Block index / active chain / orphan pool collaborator traits
// - In-memory block tree for embedders and tests
// - Network identity (main / test) and startup configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod block;
pub mod config;
pub mod memory_chain;
pub mod network;

pub use block::{BlockIndex, ChainView, OrphanBlock, OrphanPool};
pub use config::{
    CheckpointConfig, ConfigError, CHECKPOINT_MAX_SPAN, DEFAULT_MATURE_AGE_SECS,
    DEFAULT_MATURITY_DEPTH, DEFAULT_STALE_WARNING_SECS,
};
pub use cps_crypto::Hash256;
pub use memory_chain::MemoryChain;
pub use network::Network;

/// Peer identifier as assigned by the transport layer
pub type PeerId = String;

/// Current Unix time in seconds
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
