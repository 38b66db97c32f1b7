// In-memory block tree with an explicit active chain.
//
// Used by light embedders and by every test suite in the workspace. Block
// hashes are synthetic: hash256(prev || height || time || nonce).

use crate::block::{BlockIndex, ChainView};
use cps_crypto::{hash256, Hash256};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct MemoryChain {
    blocks: HashMap<Hash256, BlockIndex>,
    /// Active chain hashes indexed by height
    active: Vec<Hash256>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain holding only a genesis block, which is also the tip.
    pub fn with_genesis(time: u64) -> (Self, BlockIndex) {
        let genesis = Self::build_index(Hash256::ZERO, 0, time, 0);
        let mut chain = Self::new();
        chain.blocks.insert(genesis.hash, genesis);
        chain.active.push(genesis.hash);
        (chain, genesis)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn height(&self) -> Option<u64> {
        (self.active.len() as u64).checked_sub(1)
    }

    /// Add a block to the tree without touching the active chain.
    ///
    /// Returns `None` if `parent` is given but unknown. `nonce` lets tests
    /// build competing siblings with identical parent and time.
    pub fn insert(&mut self, parent: Option<&Hash256>, time: u64, nonce: u64) -> Option<BlockIndex> {
        let (prev_hash, height) = match parent {
            Some(p) => {
                let parent = self.blocks.get(p)?;
                (parent.hash, parent.height + 1)
            }
            None => (Hash256::ZERO, 0),
        };

        let index = Self::build_index(prev_hash, height, time, nonce);
        self.blocks.insert(index.hash, index);
        Some(index)
    }

    fn build_index(prev_hash: Hash256, height: u64, time: u64, nonce: u64) -> BlockIndex {
        let mut preimage = Vec::with_capacity(56);
        preimage.extend_from_slice(prev_hash.as_bytes());
        preimage.extend_from_slice(&height.to_le_bytes());
        preimage.extend_from_slice(&time.to_le_bytes());
        preimage.extend_from_slice(&nonce.to_le_bytes());

        BlockIndex {
            hash: hash256(&preimage),
            prev_hash,
            height,
            time,
        }
    }

    /// Insert a block and make it the active tip.
    pub fn connect(&mut self, parent: Option<&Hash256>, time: u64, nonce: u64) -> Option<BlockIndex> {
        let index = self.insert(parent, time, nonce)?;
        self.set_tip(&index.hash);
        Some(index)
    }

    /// Append `count` blocks on top of the active tip, `spacing` seconds apart.
    pub fn extend_tip(&mut self, count: usize, spacing: u64) -> Vec<BlockIndex> {
        let mut added = Vec::with_capacity(count);
        for _ in 0..count {
            let tip = match self.tip() {
                Some(t) => t,
                None => break,
            };
            if let Some(index) = self.connect(Some(&tip.hash), tip.time + spacing, 0) {
                added.push(index);
            }
        }
        added
    }

    /// Switch the active chain to end at `hash` (a reorganization when the
    /// new tip is on a different branch). Returns false if `hash` is unknown.
    pub fn set_tip(&mut self, hash: &Hash256) -> bool {
        let mut cursor = match self.blocks.get(hash) {
            Some(b) => *b,
            None => return false,
        };

        let mut path = vec![cursor.hash];
        while cursor.height > 0 {
            cursor = match self.blocks.get(&cursor.prev_hash) {
                Some(b) => *b,
                None => return false,
            };
            path.push(cursor.hash);
        }
        path.reverse();
        self.active = path;
        true
    }

    pub fn active_at(&self, height: u64) -> Option<BlockIndex> {
        let hash = self.active.get(usize::try_from(height).ok()?)?;
        self.blocks.get(hash).copied()
    }
}

impl ChainView for MemoryChain {
    fn block_index(&self, hash: &Hash256) -> Option<BlockIndex> {
        self.blocks.get(hash).copied()
    }

    fn is_in_main_chain(&self, hash: &Hash256) -> bool {
        match self.blocks.get(hash) {
            Some(b) => self.active.get(b.height as usize) == Some(hash),
            None => false,
        }
    }

    fn tip(&self) -> Option<BlockIndex> {
        let hash = self.active.last()?;
        self.blocks.get(hash).copied()
    }

    fn ancestor_at(&self, from: &BlockIndex, height: u64) -> Option<BlockIndex> {
        if height > from.height {
            return None;
        }
        // Fast path: active chain is indexed by height
        if self.is_in_main_chain(&from.hash) {
            return self.active_at(height);
        }
        let mut cursor = *from;
        while cursor.height > height {
            cursor = *self.blocks.get(&cursor.prev_hash)?;
        }
        Some(cursor)
    }
}
