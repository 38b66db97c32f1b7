// Peer transport seam.
//
// The node's connection manager owns sockets; the checkpoint code only
// needs to enumerate peers, queue an outbound message, and report abuse.
// ChannelTransport backs each peer with a bounded tokio mpsc queue.

use crate::NetworkError;
use cps_core::{Hash256, PeerId};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Outbound queue depth per peer
pub const PEER_QUEUE_CAPACITY: usize = 32;

/// Misbehavior score at which a peer is dropped
pub const BAN_THRESHOLD: u32 = 100;

/// Messages the checkpoint subsystem sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Encoded `checkpoint` payload
    Checkpoint(Vec<u8>),
    /// Request for the block chain leading up to `hash`
    GetBlocks(Hash256),
}

impl OutboundMessage {
    /// Wire command name
    pub fn command(&self) -> &'static str {
        match self {
            OutboundMessage::Checkpoint(_) => "checkpoint",
            OutboundMessage::GetBlocks(_) => "getblocks",
        }
    }
}

pub trait PeerTransport: Send + Sync {
    fn connected_peers(&self) -> Vec<PeerId>;

    /// Queue `message` for `peer` without waiting for delivery.
    fn push_message(&self, peer: &PeerId, message: OutboundMessage) -> Result<(), NetworkError>;

    /// Add `score` to the peer's misbehavior counter.
    fn misbehaving(&self, peer: &PeerId, score: u32);
}

struct PeerHandle {
    tx: mpsc::Sender<OutboundMessage>,
    ban_score: u32,
}

/// In-process transport: one bounded channel per registered peer.
#[derive(Default)]
pub struct ChannelTransport {
    peers: Mutex<HashMap<PeerId, PeerHandle>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `peer` and return the receiving end of its outbound queue.
    pub fn register_peer(&self, peer: impl Into<PeerId>) -> mpsc::Receiver<OutboundMessage> {
        let peer = peer.into();
        let (tx, rx) = mpsc::channel(PEER_QUEUE_CAPACITY);
        let mut peers = self.peers.lock().unwrap_or_else(|e| e.into_inner());
        peers.insert(peer, PeerHandle { tx, ban_score: 0 });
        rx
    }

    pub fn disconnect(&self, peer: &PeerId) -> bool {
        let mut peers = self.peers.lock().unwrap_or_else(|e| e.into_inner());
        peers.remove(peer).is_some()
    }

    pub fn ban_score(&self, peer: &PeerId) -> u32 {
        let peers = self.peers.lock().unwrap_or_else(|e| e.into_inner());
        peers.get(peer).map(|p| p.ban_score).unwrap_or(0)
    }

    pub fn is_connected(&self, peer: &PeerId) -> bool {
        let peers = self.peers.lock().unwrap_or_else(|e| e.into_inner());
        peers.contains_key(peer)
    }
}

impl PeerTransport for ChannelTransport {
    fn connected_peers(&self) -> Vec<PeerId> {
        let peers = self.peers.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<PeerId> = peers.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn push_message(&self, peer: &PeerId, message: OutboundMessage) -> Result<(), NetworkError> {
        let tx = {
            let peers = self.peers.lock().unwrap_or_else(|e| e.into_inner());
            match peers.get(peer) {
                Some(handle) => handle.tx.clone(),
                None => return Err(NetworkError::PeerNotConnected(peer.clone())),
            }
        };

        match tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(NetworkError::QueueFull(peer.clone())),
            Err(TrySendError::Closed(_)) => Err(NetworkError::ChannelClosed(peer.clone())),
        }
    }

    fn misbehaving(&self, peer: &PeerId, score: u32) {
        let mut peers = self.peers.lock().unwrap_or_else(|e| e.into_inner());
        let banned = match peers.get_mut(peer) {
            Some(handle) => {
                handle.ban_score = handle.ban_score.saturating_add(score);
                warn!(
                    "Peer {} misbehaving (+{}, total {})",
                    peer, score, handle.ban_score
                );
                handle.ban_score >= BAN_THRESHOLD
            }
            None => false,
        };
        if banned {
            peers.remove(peer);
            info!("Peer {} disconnected: ban score reached {}", peer, BAN_THRESHOLD);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_and_receive() {
        let transport = ChannelTransport::new();
        let mut rx = transport.register_peer("peer-a");

        transport
            .push_message(&"peer-a".to_string(), OutboundMessage::Checkpoint(vec![1, 2, 3]))
            .unwrap();
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.command(), "checkpoint");
        assert_eq!(msg, OutboundMessage::Checkpoint(vec![1, 2, 3]));
    }

    #[test]
    fn test_unknown_peer() {
        let transport = ChannelTransport::new();
        let result = transport.push_message(&"ghost".to_string(), OutboundMessage::GetBlocks(Hash256::ZERO));
        assert!(matches!(result, Err(NetworkError::PeerNotConnected(_))));
    }

    #[test]
    fn test_closed_and_full_queue() {
        let transport = ChannelTransport::new();
        let rx = transport.register_peer("peer-a");
        let peer = "peer-a".to_string();

        for _ in 0..PEER_QUEUE_CAPACITY {
            transport.push_message(&peer, OutboundMessage::GetBlocks(Hash256::ZERO)).unwrap();
        }
        assert!(matches!(
            transport.push_message(&peer, OutboundMessage::GetBlocks(Hash256::ZERO)),
            Err(NetworkError::QueueFull(_))
        ));

        drop(rx);
        assert!(matches!(
            transport.push_message(&peer, OutboundMessage::GetBlocks(Hash256::ZERO)),
            Err(NetworkError::ChannelClosed(_))
        ));
    }

    #[test]
    fn test_misbehaving_bans_at_threshold() {
        let transport = ChannelTransport::new();
        let _rx = transport.register_peer("peer-a");
        let peer = "peer-a".to_string();

        transport.misbehaving(&peer, 40);
        assert_eq!(transport.ban_score(&peer), 40);
        assert!(transport.is_connected(&peer));

        transport.misbehaving(&peer, 60);
        assert!(!transport.is_connected(&peer));
        assert!(transport.connected_peers().is_empty());
    }

    #[test]
    fn test_connected_peers_sorted() {
        let transport = ChannelTransport::new();
        let _b = transport.register_peer("b");
        let _a = transport.register_peer("a");
        assert_eq!(transport.connected_peers(), vec!["a".to_string(), "b".to_string()]);
        assert!(transport.disconnect(&"a".to_string()));
        assert_eq!(transport.connected_peers(), vec!["b".to_string()]);
    }
}
