use crate::{
    constants::{GENESIS_INDEX, GENESIS_PREVIOUS_HASH, GENESIS_PROOF, GENESIS_TIMESTAMP},
    error::ChainIntegrityError,
    pow::is_valid_proof,
    Block,
};
use anyhow::Result;

/// Trait the storage backends implement to persist the chain.
/// This lives in the core to avoid a circular dependency.
pub trait ChainStore: Send + Sync {
    fn put_block(&self, block: &Block) -> Result<()>;
    /// All stored blocks in index order.
    fn load_blocks(&self) -> Result<Vec<Block>>;
    /// Atomically swaps the stored chain for `blocks`.
    fn replace_blocks(&self, blocks: &[Block]) -> Result<()>;
    fn tip_height(&self) -> Result<Option<u64>>;
    fn close(&self) -> Result<()>;
}

/// The fixed starting block shared by every node.
pub fn genesis_block() -> Block {
    Block::new(
        GENESIS_INDEX,
        GENESIS_TIMESTAMP,
        vec![],
        GENESIS_PROOF,
        GENESIS_PREVIOUS_HASH,
    )
}

/// Append-only sequence of blocks. Never empty: it starts at genesis.
#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
    difficulty: u32,
}

impl Chain {
    pub fn new(difficulty: u32) -> Self {
        Self {
            blocks: vec![genesis_block()],
            difficulty,
        }
    }

    /// Rebuilds a chain from previously stored blocks.
    pub fn from_blocks(blocks: Vec<Block>, difficulty: u32) -> Result<Self, ChainIntegrityError> {
        Self::validate(&blocks, difficulty)?;
        Ok(Self { blocks, difficulty })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    pub fn last(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    /// Index the next appended block must carry.
    pub fn next_index(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Checks that `block` may follow the current tip.
    pub fn check_append(&self, block: &Block) -> Result<(), ChainIntegrityError> {
        check_successor(self.last(), block, self.next_index(), self.difficulty)
    }

    pub fn append(&mut self, block: Block) -> Result<(), ChainIntegrityError> {
        self.check_append(&block)?;
        self.blocks.push(block);
        Ok(())
    }

    /// Swaps in `blocks` wholesale. Callers validate and compare lengths first.
    pub fn replace(&mut self, blocks: Vec<Block>) {
        debug_assert!(!blocks.is_empty());
        self.blocks = blocks;
    }

    /// Walks a candidate chain and reports the first violation.
    pub fn validate(blocks: &[Block], difficulty: u32) -> Result<(), ChainIntegrityError> {
        let genesis = blocks.first().ok_or(ChainIntegrityError::Empty)?;
        if genesis.index != GENESIS_INDEX {
            return Err(ChainIntegrityError::IndexMismatch {
                position: 0,
                found: genesis.index,
            });
        }
        if !genesis.is_sealed() {
            return Err(ChainIntegrityError::HashMismatch {
                index: genesis.index,
            });
        }
        for (position, pair) in blocks.windows(2).enumerate() {
            check_successor(&pair[0], &pair[1], position as u64 + 1, difficulty)?;
        }
        Ok(())
    }

    pub fn is_valid(blocks: &[Block], difficulty: u32) -> bool {
        Self::validate(blocks, difficulty).is_ok()
    }
}

fn check_successor(
    previous: &Block,
    block: &Block,
    position: u64,
    difficulty: u32,
) -> Result<(), ChainIntegrityError> {
    if block.index != position {
        return Err(ChainIntegrityError::IndexMismatch {
            position,
            found: block.index,
        });
    }
    if !block.is_sealed() {
        return Err(ChainIntegrityError::HashMismatch { index: block.index });
    }
    if block.previous_hash != previous.hash {
        return Err(ChainIntegrityError::BrokenLink { index: block.index });
    }
    if !is_valid_proof(previous.proof, block.proof, difficulty) {
        return Err(ChainIntegrityError::InvalidProof {
            index: block.index,
            proof: block.proof,
        });
    }
    Ok(())
}
