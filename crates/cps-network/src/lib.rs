// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CHECKPOINT SYNC (CPS) - NETWORK
//
// Checkpoint propagation on top of the node's peer transport.
// - transport: PeerTransport seam + tokio channel implementation
// - relay:     per-peer deduplicated fan-out and ancestor requests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod relay;
pub mod transport;

use cps_core::PeerId;

pub use relay::RelayProtocol;
pub use transport::{
    ChannelTransport, OutboundMessage, PeerTransport, BAN_THRESHOLD, PEER_QUEUE_CAPACITY,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    #[error("Peer {0} is not connected")]
    PeerNotConnected(PeerId),
    #[error("Outbound channel to {0} is closed")]
    ChannelClosed(PeerId),
    #[error("Outbound queue to {0} is full")]
    QueueFull(PeerId),
    #[error("Cannot encode message: {0}")]
    Encode(String),
}
