// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CHECKPOINT SYNC (CPS) - SIGNATURE AUTHORITY
//
// Exactly one master public key is active per process, chosen by network.
// A node holding the matching private key may sign new checkpoints; every
// other node only verifies.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::error::CheckpointError;
use crate::message::SyncCheckpoint;
use cps_core::Network;
use cps_crypto::{MasterPublicKey, MasterSecretKey};
use log::{info, warn};

/// Ed25519 master public key for the main network
pub const CHECKPOINT_MAIN_PUBKEY: &str =
    "3b56dcf1ef1045b0071a9e6909da49b2dc24cce8d568f017fd7101f6a1e8b45c";

/// Ed25519 master public key for the test network
pub const CHECKPOINT_TEST_PUBKEY: &str =
    "3fdc11c86230e6aace05d2be7c7ad45d6704d8721bc26bd52eeb1e0ef53368ad";

/// Compiled hex master key for `network`.
pub fn compiled_public_key(network: Network) -> &'static str {
    match network {
        Network::Main => CHECKPOINT_MAIN_PUBKEY,
        Network::Test => CHECKPOINT_TEST_PUBKEY,
    }
}

/// Decode the compiled master key for `network`. Fails at startup if the
/// constant is empty or not a valid point.
pub fn select_public_key(network: Network) -> Result<MasterPublicKey, CheckpointError> {
    MasterPublicKey::from_hex(compiled_public_key(network))
        .map_err(|source| CheckpointError::InvalidPublicKey { network, source })
}

#[derive(Debug)]
pub struct SignatureAuthority {
    network: Network,
    public_key: MasterPublicKey,
    master_key: Option<MasterSecretKey>,
}

impl SignatureAuthority {
    /// Verify-only authority using the compiled key for `network`.
    pub fn for_network(network: Network) -> Result<Self, CheckpointError> {
        let public_key = select_public_key(network)?;
        Ok(Self::with_public_key(network, public_key))
    }

    /// Authority with an explicit master key (private networks, tests).
    pub fn with_public_key(network: Network, public_key: MasterPublicKey) -> Self {
        Self {
            network,
            public_key,
            master_key: None,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn public_key(&self) -> &MasterPublicKey {
        &self.public_key
    }

    /// True once a private key matching the master public key is loaded.
    pub fn is_authority(&self) -> bool {
        self.master_key.is_some()
    }

    /// Load the master private key (hex seed).
    ///
    /// An unparseable key, or one whose public half differs from the active
    /// master key, is rejected and any previously loaded key is dropped,
    /// leaving the node verify-only.
    pub fn set_private_key(&mut self, encoded: &str) -> Result<(), CheckpointError> {
        let key = match MasterSecretKey::from_hex(encoded) {
            Ok(k) => k,
            Err(e) => {
                self.master_key = None;
                warn!("Checkpoint private key unreadable; staying verify-only");
                return Err(e.into());
            }
        };
        if key.public_key() != self.public_key {
            self.master_key = None;
            warn!(
                "Checkpoint private key does not match the {} master key; staying verify-only",
                self.network
            );
            return Err(CheckpointError::KeyMismatch {
                network: self.network,
            });
        }

        self.master_key = Some(key);
        info!("Checkpoint master key loaded ({} network)", self.network);
        Ok(())
    }

    /// Sign hash256(signedBytes) and store the signature in `checkpoint`.
    pub fn sign(&self, checkpoint: &mut SyncCheckpoint) -> Result<(), CheckpointError> {
        let key = self.master_key.as_ref().ok_or_else(|| {
            CheckpointError::Signing("no checkpoint master private key loaded".to_string())
        })?;
        let signature = key.sign_digest(&checkpoint.message_hash());
        checkpoint.set_signature(signature);
        Ok(())
    }

    /// Pure check of the signature against the active master key.
    pub fn verify(&self, checkpoint: &SyncCheckpoint) -> bool {
        self.public_key
            .verify_digest(&checkpoint.message_hash(), checkpoint.signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cps_crypto::hash256;

    const TEST_SEED: &str = "cfc77fe78462f365151f7effca5bdba8ef8abfdc29a9b9324096e6536ae4162a";
    const FOREIGN_SEED: &str = "cca43a527efb173bb5410f8af52de7484a2847dd8ebd7d382a2ca792c6f7dd86";

    fn signer() -> SignatureAuthority {
        let mut authority = SignatureAuthority::for_network(Network::Test).unwrap();
        authority.set_private_key(TEST_SEED).unwrap();
        authority
    }

    #[test]
    fn test_compiled_keys_decode() {
        for net in [Network::Main, Network::Test] {
            let key = select_public_key(net).unwrap();
            assert_eq!(key.to_hex(), compiled_public_key(net));
        }
        assert_ne!(CHECKPOINT_MAIN_PUBKEY, CHECKPOINT_TEST_PUBKEY);
    }

    #[test]
    fn test_verify_only_by_default() {
        let authority = SignatureAuthority::for_network(Network::Main).unwrap();
        assert!(!authority.is_authority());

        let mut cp = SyncCheckpoint::new_unsigned(hash256(b"b")).unwrap();
        assert!(matches!(
            authority.sign(&mut cp),
            Err(CheckpointError::Signing(_))
        ));
    }

    #[test]
    fn test_sign_then_verify() {
        let authority = signer();
        assert!(authority.is_authority());

        let mut cp = SyncCheckpoint::new_unsigned(hash256(b"block")).unwrap();
        assert!(!authority.verify(&cp));
        authority.sign(&mut cp).unwrap();
        assert_eq!(cp.signature().len(), 64);
        assert!(authority.verify(&cp));
    }

    #[test]
    fn test_signature_bound_to_network_key() {
        let mut cp = SyncCheckpoint::new_unsigned(hash256(b"block")).unwrap();
        signer().sign(&mut cp).unwrap();

        let mainnet = SignatureAuthority::for_network(Network::Main).unwrap();
        assert!(!mainnet.verify(&cp));
    }

    #[test]
    fn test_mismatched_private_key() {
        let mut authority = signer();
        let result = authority.set_private_key(FOREIGN_SEED);
        assert!(matches!(
            result,
            Err(CheckpointError::KeyMismatch {
                network: Network::Test
            })
        ));
        assert!(!authority.is_authority());
    }

    #[test]
    fn test_garbage_private_key() {
        let mut authority = SignatureAuthority::for_network(Network::Test).unwrap();
        assert!(matches!(
            authority.set_private_key("not-hex"),
            Err(CheckpointError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            authority.set_private_key("abcd"),
            Err(CheckpointError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_unreadable_reload_drops_loaded_key() {
        let mut authority = signer();
        assert!(authority.is_authority());

        assert!(authority.set_private_key("zz").is_err());
        assert!(!authority.is_authority());

        let mut cp = SyncCheckpoint::new_unsigned(hash256(b"block")).unwrap();
        assert!(matches!(
            authority.sign(&mut cp),
            Err(CheckpointError::Signing(_))
        ));
    }

    #[test]
    fn test_tampered_signed_bytes_fail() {
        let mut cp = SyncCheckpoint::new_unsigned(hash256(b"block")).unwrap();
        let authority = signer();
        authority.sign(&mut cp).unwrap();

        let mut msg = cp.signed_bytes().to_vec();
        msg[10] ^= 0x01;
        let tampered = SyncCheckpoint::from_parts(msg, cp.signature().to_vec()).unwrap();
        assert!(!authority.verify(&tampered));
    }
}
