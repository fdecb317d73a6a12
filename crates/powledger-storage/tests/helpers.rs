#![allow(dead_code)]

use std::fs;

use powledger_core::{Block, CancelToken, Chain, Miner, Transaction};
use powledger_storage::SledStore;
use tempfile::{tempdir, TempDir};

pub const TEST_DIFFICULTY: u32 = 2;

pub fn create_temp_store() -> (TempDir, SledStore) {
    // Create a temporary directory for the sled database
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().to_path_buf();
    (
        temp_dir,
        SledStore::open(&db_path).expect("Failed to open SledStore"),
    )
}

pub fn teardown_store(temp_dir: TempDir, store: SledStore) {
    let db_path = temp_dir.path().to_path_buf();
    store.clear().expect("Failed to clear the store");
    drop(store);
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    assert!(!db_path.exists(), "Database directory should be removed");
}

/// A valid chain of `len` blocks, `txs_per_block` transactions each.
pub fn mined_chain(len: usize, txs_per_block: usize, tag: &str) -> Vec<Block> {
    let miner = Miner::new(TEST_DIFFICULTY);
    let mut chain = Chain::new(TEST_DIFFICULTY);
    for i in 1..len {
        let last = chain.last().clone();
        let proof = miner
            .find_proof(last.proof, &CancelToken::new())
            .expect("proof");
        let txs = (0..txs_per_block)
            .map(|t| Transaction::new(format!("{tag}-{i}"), format!("to-{t}"), t as u64))
            .collect();
        chain
            .append(Block::new(i as u64, 1_600_000_000 + i as u64, txs, proof, last.hash))
            .expect("append");
    }
    chain.into_blocks()
}
