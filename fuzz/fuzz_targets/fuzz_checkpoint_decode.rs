//! Fuzz target: checkpoint wire decoding
//!
//! Feeds arbitrary peer bytes to SyncCheckpoint::from_wire. Decoding must
//! never panic, and anything that decodes must re-encode to the same bytes.
//!
//! Run: cargo +nightly fuzz run fuzz_checkpoint_decode -- -max_len=2048

#![no_main]
use cps_consensus::{SyncCheckpoint, MAX_CHECKPOINT_MESSAGE_SIZE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(cp) = SyncCheckpoint::from_wire(data) {
        assert!(data.len() <= MAX_CHECKPOINT_MESSAGE_SIZE as usize);
        let wire = cp.to_wire().expect("decoded checkpoint re-encodes");
        assert_eq!(wire, data);
    }
});
