//! Fuzz target: acceptance of arbitrary peer payloads
//!
//! Decodes fuzzer bytes as a checkpoint and runs it through the acceptance
//! engine against a small fixed chain. Must not panic; the accepted hash
//! must stay on the active chain.
//!
//! Run: cargo +nightly fuzz run fuzz_process_incoming

#![no_main]
use cps_consensus::{AcceptanceEngine, CheckpointParams, SharedCheckpointState, SignatureAuthority, SyncCheckpoint};
use cps_core::{ChainView, MemoryChain, Network};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let cp = match SyncCheckpoint::from_wire(data) {
        Ok(cp) => cp,
        Err(_) => return,
    };

    let (mut chain, _) = MemoryChain::with_genesis(1_700_000_000);
    chain.extend_tip(16, 60);
    let authority = match SignatureAuthority::for_network(Network::Test) {
        Ok(a) => a,
        Err(_) => return,
    };
    let engine = AcceptanceEngine::new(authority, CheckpointParams::default());
    let state = SharedCheckpointState::default();

    let _ = engine.process_incoming(&state, &chain, &cp);
    let accepted = state.accepted_hash();
    assert!(accepted.is_zero() || chain.is_in_main_chain(&accepted));
});
