//! Chain collaborator interfaces consumed by the checkpoint subsystem.
//!
//! The block index, chain selection and orphan pool are owned elsewhere in
//! the node; the checkpoint code only needs the read-only views below.

use cps_crypto::Hash256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Position of a known block in the block tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockIndex {
    pub hash: Hash256,
    /// Zero for the genesis block
    pub prev_hash: Hash256,
    pub height: u64,
    /// Block timestamp (Unix seconds)
    pub time: u64,
}

/// Read access to the block index and the active chain.
pub trait ChainView: Send + Sync {
    /// Look up any known block, on the active chain or not.
    fn block_index(&self, hash: &Hash256) -> Option<BlockIndex>;

    /// True if `hash` is part of the currently active chain.
    fn is_in_main_chain(&self, hash: &Hash256) -> bool;

    /// Tip of the active chain, `None` before genesis is loaded.
    fn tip(&self) -> Option<BlockIndex>;

    fn contains(&self, hash: &Hash256) -> bool {
        self.block_index(hash).is_some()
    }

    /// Walk parent links from `from` down to `height`.
    ///
    /// Returns `None` when `height` is above `from`, when a parent link is
    /// missing, or when heights along the walk fail to decrease.
    fn ancestor_at(&self, from: &BlockIndex, height: u64) -> Option<BlockIndex> {
        if height > from.height {
            return None;
        }
        let mut cursor = *from;
        while cursor.height > height {
            let parent = self.block_index(&cursor.prev_hash)?;
            if parent.height >= cursor.height {
                return None;
            }
            cursor = parent;
        }
        Some(cursor)
    }

    /// Genesis block of the active chain.
    fn genesis(&self) -> Option<BlockIndex> {
        let tip = self.tip()?;
        self.ancestor_at(&tip, 0)
    }
}

impl<C: ChainView> ChainView for RwLock<C> {
    fn block_index(&self, hash: &Hash256) -> Option<BlockIndex> {
        self.read()
            .unwrap_or_else(|e| e.into_inner())
            .block_index(hash)
    }

    fn is_in_main_chain(&self, hash: &Hash256) -> bool {
        self.read()
            .unwrap_or_else(|e| e.into_inner())
            .is_in_main_chain(hash)
    }

    fn tip(&self) -> Option<BlockIndex> {
        self.read().unwrap_or_else(|e| e.into_inner()).tip()
    }

    fn ancestor_at(&self, from: &BlockIndex, height: u64) -> Option<BlockIndex> {
        self.read()
            .unwrap_or_else(|e| e.into_inner())
            .ancestor_at(from, height)
    }
}

/// A received block whose parent is not (yet) in the block index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrphanBlock {
    pub hash: Hash256,
    pub prev_hash: Hash256,
}

/// Read access to the node's orphan block pool.
pub trait OrphanPool: Send + Sync {
    fn orphan(&self, hash: &Hash256) -> Option<OrphanBlock>;

    fn orphan_count(&self) -> usize;

    fn contains_orphan(&self, hash: &Hash256) -> bool {
        self.orphan(hash).is_some()
    }
}

impl OrphanPool for HashMap<Hash256, OrphanBlock> {
    fn orphan(&self, hash: &Hash256) -> Option<OrphanBlock> {
        self.get(hash).copied()
    }

    fn orphan_count(&self) -> usize {
        self.len()
    }
}

impl<P: OrphanPool> OrphanPool for RwLock<P> {
    fn orphan(&self, hash: &Hash256) -> Option<OrphanBlock> {
        self.read().unwrap_or_else(|e| e.into_inner()).orphan(hash)
    }

    fn orphan_count(&self) -> usize {
        self.read().unwrap_or_else(|e| e.into_inner()).orphan_count()
    }
}
