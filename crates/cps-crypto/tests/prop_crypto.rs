// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PROPERTY-BASED TESTS — cps-crypto
//
// Verifies signing invariants:
// - Sign/verify round-trip over arbitrary digests
// - Any single bit flip in digest or signature breaks verification
// - Hash256 hex encoding is lossless
//
// Run: cargo test -p cps-crypto --test prop_crypto
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use cps_crypto::{hash256, Hash256, MasterSecretKey};
use proptest::prelude::*;

fn fixed_key() -> MasterSecretKey {
    MasterSecretKey::from_hex("cca43a527efb173bb5410f8af52de7484a2847dd8ebd7d382a2ca792c6f7dd86")
        .unwrap()
}

// ─────────────────────────────────────────────────────────────────
// SIGNATURE PROPERTIES
// ─────────────────────────────────────────────────────────────────

proptest! {
    /// PROPERTY: a signature over hash256(data) always verifies with the matching key
    #[test]
    fn prop_sign_verify_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let key = fixed_key();
        let digest = hash256(&data);
        let sig = key.sign_digest(&digest);
        prop_assert!(key.public_key().verify_digest(&digest, &sig));
    }

    /// PROPERTY: flipping any bit of the signed data invalidates the signature
    #[test]
    fn prop_data_bit_flip_rejected(
        data in proptest::collection::vec(any::<u8>(), 1..128),
        idx in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let key = fixed_key();
        let sig = key.sign_digest(&hash256(&data));

        let mut tampered = data.clone();
        let i = idx.index(tampered.len());
        tampered[i] ^= 1 << bit;

        prop_assert!(!key.public_key().verify_digest(&hash256(&tampered), &sig));
    }

    /// PROPERTY: flipping any bit of the signature invalidates it
    #[test]
    fn prop_signature_bit_flip_rejected(
        data in proptest::collection::vec(any::<u8>(), 0..128),
        idx in 0usize..64,
        bit in 0u8..8,
    ) {
        let key = fixed_key();
        let digest = hash256(&data);
        let mut sig = key.sign_digest(&digest);
        sig[idx] ^= 1 << bit;

        prop_assert!(!key.public_key().verify_digest(&digest, &sig));
    }

    /// PROPERTY: arbitrary garbage is never accepted as a signature
    #[test]
    fn prop_garbage_signature_rejected(garbage in proptest::collection::vec(any::<u8>(), 0..100)) {
        let key = fixed_key();
        let digest = hash256(b"checkpoint");
        prop_assert!(!key.public_key().verify_digest(&digest, &garbage));
    }
}

// ─────────────────────────────────────────────────────────────────
// HASH PROPERTIES
// ─────────────────────────────────────────────────────────────────

proptest! {
    /// PROPERTY: hex encoding of Hash256 is lossless
    #[test]
    fn prop_hash_hex_lossless(bytes in any::<[u8; 32]>()) {
        let h = Hash256(bytes);
        prop_assert_eq!(Hash256::from_hex(&h.to_hex()).unwrap(), h);
    }

    /// PROPERTY: only the all-zero hash is null
    #[test]
    fn prop_only_zero_is_null(bytes in any::<[u8; 32]>()) {
        prop_assert_eq!(Hash256(bytes).is_zero(), bytes == [0u8; 32]);
    }
}
