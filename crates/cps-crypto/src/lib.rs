// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CHECKPOINT SYNC (CPS) - CRYPTOGRAPHY MODULE
//
// Primitives shared by the synchronized-checkpoint subsystem.
// - Hash256: 32-byte block and message identifier
// - hash256(): double SHA-256 digest used for message identity and signing
// - Ed25519 master keys that sign and verify checkpoint digests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

/// Length of a block / message hash in bytes
pub const HASH_LEN: usize = 32;

/// Length of an Ed25519 public key and of the secret seed
pub const KEY_LEN: usize = 32;

/// Length of a detached Ed25519 signature
pub const SIGNATURE_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid key format")]
    InvalidKey,
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// 32-byte identifier of a block or of a signed checkpoint message.
///
/// The all-zero value is the "null" sentinel: no block ever hashes to it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    pub const ZERO: Hash256 = Hash256([0u8; HASH_LEN]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; HASH_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidLength {
            expected: HASH_LEN,
            actual: bytes.len(),
        })?;
        Ok(Hash256(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 16 hex characters, for log lines.
    pub fn short(&self) -> String {
        let mut s = self.to_hex();
        s.truncate(16);
        s
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl FromStr for Hash256 {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Double SHA-256: SHA256(SHA256(data)).
pub fn hash256(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    Hash256(second.into())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MASTER KEYS (checkpoint authority)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Public half of a checkpoint master key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MasterPublicKey(VerifyingKey);

impl MasterPublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidLength {
            expected: KEY_LEN,
            actual: bytes.len(),
        })?;
        VerifyingKey::from_bytes(&arr)
            .map(MasterPublicKey)
            .map_err(|_| CryptoError::InvalidKey)
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        if bytes.is_empty() {
            return Err(CryptoError::InvalidKey);
        }
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> [u8; KEY_LEN] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Verify a detached signature over a 32-byte digest.
    ///
    /// Malformed signature bytes (wrong length, non-canonical encoding)
    /// yield `false`, never an error.
    pub fn verify_digest(&self, digest: &Hash256, signature: &[u8]) -> bool {
        let sig = match Signature::from_slice(signature) {
            Ok(s) => s,
            Err(_) => return false,
        };
        self.0.verify(digest.as_bytes(), &sig).is_ok()
    }
}

impl fmt::Debug for MasterPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterPublicKey({})", self.to_hex())
    }
}

/// Secret half of a checkpoint master key.
///
/// SECURITY: the inner signing key is zeroized on drop and never printed.
pub struct MasterSecretKey(SigningKey);

impl MasterSecretKey {
    /// Fresh random key from the OS RNG.
    pub fn generate() -> Self {
        MasterSecretKey(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Parse an operator-supplied hex-encoded 32-byte seed.
    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        let mut bytes =
            hex::decode(encoded.trim()).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        if bytes.len() != KEY_LEN {
            let actual = bytes.len();
            bytes.zeroize();
            return Err(CryptoError::InvalidLength {
                expected: KEY_LEN,
                actual,
            });
        }

        let mut seed = [0u8; KEY_LEN];
        seed.copy_from_slice(&bytes);
        bytes.zeroize();
        let key = SigningKey::from_bytes(&seed);
        seed.zeroize();

        Ok(MasterSecretKey(key))
    }

    /// Hex-encoded seed (operator export).
    pub fn to_hex(&self) -> String {
        let mut seed = self.0.to_bytes();
        let encoded = hex::encode(seed);
        seed.zeroize();
        encoded
    }

    pub fn public_key(&self) -> MasterPublicKey {
        MasterPublicKey(self.0.verifying_key())
    }

    /// Detached signature over a 32-byte digest. Ed25519 is deterministic.
    pub fn sign_digest(&self, digest: &Hash256) -> Vec<u8> {
        self.0.sign(digest.as_bytes()).to_bytes().to_vec()
    }
}

impl fmt::Debug for MasterSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterSecretKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash256_known_vectors() {
        assert_eq!(
            hash256(b"").to_hex(),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
        assert_eq!(
            hash256(b"checkpoint").to_hex(),
            "5fcb1b1a09b5ce161cacfccffde88852e96effe70d4eaeae75db76cfb40eb7ac"
        );
    }

    #[test]
    fn test_hash_zero_sentinel() {
        assert!(Hash256::ZERO.is_zero());
        assert!(Hash256::default().is_zero());
        assert!(!hash256(b"x").is_zero());
    }

    #[test]
    fn test_hash_hex_parsing() {
        let h = hash256(b"abc");
        let parsed: Hash256 = h.to_hex().parse().unwrap();
        assert_eq!(parsed, h);
        assert_eq!(h.short().len(), 16);

        assert!(matches!(
            Hash256::from_hex("zz"),
            Err(CryptoError::InvalidHex(_))
        ));
        assert_eq!(
            Hash256::from_hex("abcd"),
            Err(CryptoError::InvalidLength {
                expected: 32,
                actual: 2
            })
        );
    }

    #[test]
    fn test_master_key_from_seed_matches_known_public_key() {
        // SHA256("cps-testnet-checkpoint-master") used as the seed
        let secret = MasterSecretKey::from_hex(
            "cfc77fe78462f365151f7effca5bdba8ef8abfdc29a9b9324096e6536ae4162a",
        )
        .unwrap();
        assert_eq!(
            secret.public_key().to_hex(),
            "3fdc11c86230e6aace05d2be7c7ad45d6704d8721bc26bd52eeb1e0ef53368ad"
        );
    }

    #[test]
    fn test_secret_key_rejects_bad_encoding() {
        assert!(matches!(
            MasterSecretKey::from_hex("not-hex"),
            Err(CryptoError::InvalidHex(_))
        ));
        assert!(matches!(
            MasterSecretKey::from_hex("0011"),
            Err(CryptoError::InvalidLength { actual: 2, .. })
        ));
    }

    #[test]
    fn test_public_key_rejects_empty() {
        assert_eq!(MasterPublicKey::from_hex(""), Err(CryptoError::InvalidKey));
    }

    #[test]
    fn test_sign_and_verify_digest() {
        let secret = MasterSecretKey::generate();
        let public = secret.public_key();
        let digest = hash256(b"block-100");

        let sig = secret.sign_digest(&digest);
        assert_eq!(sig.len(), SIGNATURE_LEN);
        assert!(public.verify_digest(&digest, &sig));

        // Deterministic
        assert_eq!(sig, secret.sign_digest(&digest));

        // Wrong digest / wrong key / truncated signature
        assert!(!public.verify_digest(&hash256(b"block-101"), &sig));
        assert!(!MasterSecretKey::generate()
            .public_key()
            .verify_digest(&digest, &sig));
        assert!(!public.verify_digest(&digest, &sig[..63]));
        assert!(!public.verify_digest(&digest, &[]));
    }

    #[test]
    fn test_secret_key_hex_export_roundtrip() {
        let secret = MasterSecretKey::generate();
        let restored = MasterSecretKey::from_hex(&secret.to_hex()).unwrap();
        assert_eq!(restored.public_key(), secret.public_key());
        assert_eq!(format!("{:?}", secret), "MasterSecretKey(<redacted>)");
    }
}
