// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CHECKPOINT SYNC (CPS) - NODE INTEGRATION
//
// SyncCheckpointService is the one object a node holds: it receives
// `checkpoint` messages, gates block validation, reacts to peer and orphan
// events, and reports status.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod service;
pub mod status;

pub use service::{SyncCheckpointService, CHECKPOINT_COMMAND, INVALID_SIGNATURE_PENALTY};
pub use status::CheckpointStatus;
