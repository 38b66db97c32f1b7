//! Fuzz target: orphan root walk
//!
//! Builds an arbitrary orphan pool (cycles, self-links, dangling parents)
//! and walks it from every orphan. The walk must terminate without panic.
//!
//! Run: cargo +nightly fuzz run fuzz_orphan_walk

#![no_main]
use arbitrary::Arbitrary;
use cps_consensus::root_of_orphan;
use cps_core::{Hash256, OrphanBlock};
use libfuzzer_sys::fuzz_target;
use std::collections::HashMap;

#[derive(Debug, Arbitrary)]
struct Link {
    hash: u8,
    prev: u8,
}

fn hash(n: u8) -> Hash256 {
    Hash256([n; 32])
}

fuzz_target!(|links: Vec<Link>| {
    let pool: HashMap<Hash256, OrphanBlock> = links
        .iter()
        .map(|l| {
            let orphan = OrphanBlock {
                hash: hash(l.hash),
                prev_hash: hash(l.prev),
            };
            (orphan.hash, orphan)
        })
        .collect();

    for orphan in pool.values() {
        if let Ok(root) = root_of_orphan(&pool, orphan) {
            assert!(!pool.contains_key(&root));
        }
    }
});
