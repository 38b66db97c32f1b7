// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CHECKPOINT SYNC (CPS) - CHECKPOINT MESSAGE
//
// Wire format of the `checkpoint` message:
//   payload     = signedBytes (u64 LE length + bytes) || signature (u64 LE length + bytes)
//   signedBytes = version (i32 LE) || hashCheckpoint (32 bytes)
//
// The signature covers hash256(signedBytes), never the decoded fields, so
// the exact byte sequence received is retained and relayed unchanged.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::error::CheckpointError;
use bincode::Options;
use cps_crypto::{hash256, Hash256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format tag written by this implementation
pub const CHECKPOINT_VERSION: i32 = 1;

/// Upper bound for a decoded wire payload. A valid message is ~120 bytes.
pub const MAX_CHECKPOINT_MESSAGE_SIZE: u64 = 1024;

/// Fixed-width little-endian integers, u64 length prefixes, bounded size,
/// and no trailing garbage.
fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_CHECKPOINT_MESSAGE_SIZE)
        .reject_trailing_bytes()
}

/// Fields covered by the checkpoint signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedCheckpoint {
    pub version: i32,
    pub hash_checkpoint: Hash256,
}

impl UnsignedCheckpoint {
    pub fn new(hash_checkpoint: Hash256) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            hash_checkpoint,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CheckpointError> {
        Ok(wire_options().serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CheckpointError> {
        Ok(wire_options().deserialize(bytes)?)
    }
}

impl fmt::Display for UnsignedCheckpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SyncCheckpoint(version={}, hashCheckpoint={})",
            self.version, self.hash_checkpoint
        )
    }
}

#[derive(Serialize, Deserialize)]
struct WirePayload {
    msg: Vec<u8>,
    sig: Vec<u8>,
}

/// A checkpoint message: the unsigned body plus the exact signed bytes and
/// the detached signature over their digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCheckpoint {
    unsigned: UnsignedCheckpoint,
    msg: Vec<u8>,
    sig: Vec<u8>,
}

impl SyncCheckpoint {
    /// Fresh, not yet signed message for `hash_checkpoint`.
    pub fn new_unsigned(hash_checkpoint: Hash256) -> Result<Self, CheckpointError> {
        let unsigned = UnsignedCheckpoint::new(hash_checkpoint);
        let msg = unsigned.encode()?;
        Ok(Self {
            unsigned,
            msg,
            sig: Vec::new(),
        })
    }

    /// Rebuild from received signed bytes and signature.
    pub fn from_parts(msg: Vec<u8>, sig: Vec<u8>) -> Result<Self, CheckpointError> {
        let unsigned = UnsignedCheckpoint::decode(&msg)?;
        Ok(Self { unsigned, msg, sig })
    }

    /// Decode a `checkpoint` wire payload.
    pub fn from_wire(payload: &[u8]) -> Result<Self, CheckpointError> {
        let wire: WirePayload = wire_options().deserialize(payload)?;
        Self::from_parts(wire.msg, wire.sig)
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, CheckpointError> {
        let wire = WirePayload {
            msg: self.msg.clone(),
            sig: self.sig.clone(),
        };
        Ok(wire_options().serialize(&wire)?)
    }

    pub fn version(&self) -> i32 {
        self.unsigned.version
    }

    pub fn hash_checkpoint(&self) -> Hash256 {
        self.unsigned.hash_checkpoint
    }

    pub fn unsigned(&self) -> &UnsignedCheckpoint {
        &self.unsigned
    }

    pub fn signed_bytes(&self) -> &[u8] {
        &self.msg
    }

    pub fn signature(&self) -> &[u8] {
        &self.sig
    }

    pub(crate) fn set_signature(&mut self, sig: Vec<u8>) {
        self.sig = sig;
    }

    /// hash256(signedBytes): the digest that is signed and the message identity.
    pub fn message_hash(&self) -> Hash256 {
        hash256(&self.msg)
    }

    /// True for the "no checkpoint" sentinel.
    pub fn is_null(&self) -> bool {
        self.unsigned.hash_checkpoint.is_zero()
    }
}

impl fmt::Display for SyncCheckpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.unsigned.fmt(f)
    }
}
