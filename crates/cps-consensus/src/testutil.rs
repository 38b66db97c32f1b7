//! Fixtures shared by the unit tests of this crate.

use crate::acceptance::{AcceptanceEngine, CheckpointParams};
use crate::authority::SignatureAuthority;
use crate::message::SyncCheckpoint;
use cps_core::{BlockIndex, MemoryChain, Network};
use cps_crypto::Hash256;

/// Seed of the test-network checkpoint master key
pub const TEST_SEED: &str = "cfc77fe78462f365151f7effca5bdba8ef8abfdc29a9b9324096e6536ae4162a";

pub const GENESIS_TIME: u64 = 1_700_000_000;
pub const SPACING: u64 = 60;

pub fn authority() -> SignatureAuthority {
    let mut authority = SignatureAuthority::for_network(Network::Test).unwrap();
    authority.set_private_key(TEST_SEED).unwrap();
    authority
}

pub fn engine() -> AcceptanceEngine {
    AcceptanceEngine::new(authority(), CheckpointParams::default())
}

pub fn signed(hash: Hash256) -> SyncCheckpoint {
    let mut cp = SyncCheckpoint::new_unsigned(hash).unwrap();
    authority().sign(&mut cp).unwrap();
    cp
}

/// Main chain of `len + 1` blocks plus the hashes it had when built.
pub struct TestChain {
    pub chain: MemoryChain,
    main: Vec<BlockIndex>,
}

impl TestChain {
    pub fn new(len: usize) -> Self {
        let (mut chain, genesis) = MemoryChain::with_genesis(GENESIS_TIME);
        let mut main = vec![genesis];
        main.extend(chain.extend_tip(len, SPACING));
        Self { chain, main }
    }

    /// Hash of the original main-chain block at `height`.
    pub fn at(&self, height: u64) -> Hash256 {
        self.main[height as usize].hash
    }

    pub fn index(&self, height: u64) -> BlockIndex {
        self.main[height as usize]
    }

    /// Side branch of `count` blocks on top of main-chain block `height`.
    /// Does not change the active tip.
    pub fn fork_from(&mut self, height: u64, count: usize) -> Vec<BlockIndex> {
        let mut parent = self.index(height);
        let mut branch = Vec::with_capacity(count);
        for _ in 0..count {
            let block = self
                .chain
                .insert(Some(&parent.hash), parent.time + SPACING, 1)
                .unwrap();
            branch.push(block);
            parent = block;
        }
        branch
    }
}
