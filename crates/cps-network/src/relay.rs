// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CHECKPOINT SYNC (CPS) - RELAY PROTOCOL
//
// Fan-out of accepted checkpoints with per-peer deduplication: a peer is
// sent a given checkpoint hash at most once. The peer -> last hash map is
// owned here, not by the peer objects.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::transport::{OutboundMessage, PeerTransport};
use crate::NetworkError;
use cps_consensus::SyncCheckpoint;
use cps_core::{Hash256, PeerId};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct RelayProtocol {
    known: Mutex<HashMap<PeerId, Hash256>>,
}

impl RelayProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    fn known(&self) -> MutexGuard<'_, HashMap<PeerId, Hash256>> {
        self.known.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Send `checkpoint` to `peer` unless the peer already has its hash.
    ///
    /// Returns `Ok(true)` when the message was queued, `Ok(false)` when the
    /// peer already knew it. A failed enqueue restores the previous entry
    /// so a later relay retries.
    pub fn relay_to(
        &self,
        transport: &dyn PeerTransport,
        peer: &PeerId,
        checkpoint: &SyncCheckpoint,
    ) -> Result<bool, NetworkError> {
        let hash = checkpoint.hash_checkpoint();
        let previous = {
            let mut known = self.known();
            if known.get(peer) == Some(&hash) {
                return Ok(false);
            }
            known.insert(peer.clone(), hash)
        };

        let payload = match checkpoint.to_wire() {
            Ok(p) => p,
            Err(e) => {
                self.restore(peer, hash, previous);
                return Err(NetworkError::Encode(e.to_string()));
            }
        };

        match transport.push_message(peer, OutboundMessage::Checkpoint(payload)) {
            Ok(()) => {
                debug!("Relayed sync-checkpoint {} to {}", hash.short(), peer);
                Ok(true)
            }
            Err(e) => {
                self.restore(peer, hash, previous);
                Err(e)
            }
        }
    }

    fn restore(&self, peer: &PeerId, hash: Hash256, previous: Option<Hash256>) {
        let mut known = self.known();
        // Only undo our own write
        if known.get(peer) == Some(&hash) {
            match previous {
                Some(prev) => {
                    known.insert(peer.clone(), prev);
                }
                None => {
                    known.remove(peer);
                }
            }
        }
    }

    /// Relay to every connected peer. Returns the number of peers actually
    /// sent to; per-peer failures are logged and skipped.
    pub fn broadcast(&self, transport: &dyn PeerTransport, checkpoint: &SyncCheckpoint) -> usize {
        let mut sent = 0;
        for peer in transport.connected_peers() {
            match self.relay_to(transport, &peer, checkpoint) {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    "Relay of sync-checkpoint {} to {} failed: {}",
                    checkpoint.hash_checkpoint().short(),
                    peer,
                    e
                ),
            }
        }
        sent
    }

    /// Record that `peer` already has `hash` (e.g. it sent it to us).
    pub fn mark_known(&self, peer: &PeerId, hash: Hash256) {
        self.known().insert(peer.clone(), hash);
    }

    pub fn known_hash(&self, peer: &PeerId) -> Option<Hash256> {
        self.known().get(peer).copied()
    }

    pub fn forget_peer(&self, peer: &PeerId) {
        self.known().remove(peer);
    }

    /// Ask `peer` (or every connected peer when `None`) for the blocks
    /// leading to `wanted`. Returns the number of requests queued.
    pub fn request_ancestors(
        &self,
        transport: &dyn PeerTransport,
        peer: Option<&PeerId>,
        wanted: &Hash256,
    ) -> usize {
        let targets = match peer {
            Some(p) => vec![p.clone()],
            None => transport.connected_peers(),
        };

        let mut queued = 0;
        for target in targets {
            match transport.push_message(&target, OutboundMessage::GetBlocks(*wanted)) {
                Ok(()) => {
                    debug!("Requested ancestors of {} from {}", wanted.short(), target);
                    queued += 1;
                }
                Err(e) => warn!("Block request for {} to {} failed: {}", wanted.short(), target, e),
            }
        }
        queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;

    // Relay never verifies, so unsigned messages are enough here
    fn checkpoint(n: u8) -> SyncCheckpoint {
        SyncCheckpoint::new_unsigned(Hash256([n; 32])).unwrap()
    }

    fn peer(id: &str) -> PeerId {
        id.to_string()
    }

    #[test]
    fn test_relay_idempotent() {
        let transport = ChannelTransport::new();
        let mut rx = transport.register_peer("a");
        let relay = RelayProtocol::new();

        assert!(relay.relay_to(&transport, &peer("a"), &checkpoint(1)).unwrap());
        assert!(!relay.relay_to(&transport, &peer("a"), &checkpoint(1)).unwrap());
        assert!(relay.relay_to(&transport, &peer("a"), &checkpoint(2)).unwrap());

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 2);
        assert_eq!(relay.known_hash(&peer("a")), Some(Hash256([2; 32])));
    }

    #[test]
    fn test_broadcast_skips_failures() {
        let transport = ChannelTransport::new();
        let _a = transport.register_peer("a");
        let b = transport.register_peer("b");
        let _c = transport.register_peer("c");
        drop(b);

        let relay = RelayProtocol::new();
        assert_eq!(relay.broadcast(&transport, &checkpoint(1)), 2);
        // b's failed send was rolled back, a and c are now deduplicated
        assert_eq!(relay.known_hash(&peer("b")), None);
        assert_eq!(relay.broadcast(&transport, &checkpoint(1)), 0);
    }

    #[test]
    fn test_failed_send_restores_previous() {
        let transport = ChannelTransport::new();
        let rx = transport.register_peer("a");
        let relay = RelayProtocol::new();

        relay.relay_to(&transport, &peer("a"), &checkpoint(1)).unwrap();
        drop(rx);
        assert!(relay.relay_to(&transport, &peer("a"), &checkpoint(2)).is_err());
        assert_eq!(relay.known_hash(&peer("a")), Some(Hash256([1; 32])));
    }

    #[test]
    fn test_mark_known_and_forget() {
        let transport = ChannelTransport::new();
        let _rx = transport.register_peer("a");
        let relay = RelayProtocol::new();

        relay.mark_known(&peer("a"), Hash256([1; 32]));
        assert!(!relay.relay_to(&transport, &peer("a"), &checkpoint(1)).unwrap());

        relay.forget_peer(&peer("a"));
        assert!(relay.relay_to(&transport, &peer("a"), &checkpoint(1)).unwrap());
    }

    #[test]
    fn test_request_ancestors() {
        let transport = ChannelTransport::new();
        let mut a = transport.register_peer("a");
        let mut b = transport.register_peer("b");
        let relay = RelayProtocol::new();
        let wanted = Hash256([9; 32]);

        assert_eq!(relay.request_ancestors(&transport, Some(&peer("a")), &wanted), 1);
        assert_eq!(a.try_recv().unwrap(), OutboundMessage::GetBlocks(wanted));
        assert!(b.try_recv().is_err());

        assert_eq!(relay.request_ancestors(&transport, None, &wanted), 2);
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_ok());

        assert_eq!(relay.request_ancestors(&transport, Some(&peer("ghost")), &wanted), 0);
    }
}
