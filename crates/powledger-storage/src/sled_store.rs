use anyhow::{Context, Result};
use powledger_core::{Block, ChainStore, Hash};
use sled::{Batch, Db, IVec, Tree};
use std::path::Path;
use tracing::{debug, info};

const TREE_BLOCKS: &str = "blocks";

/// Blocks stored bincode-encoded, keyed by big-endian index so the tree
/// iterates in chain order. The tip is the last key.
#[derive(Clone)]
pub struct SledStore {
  db: Db,
  blocks: Tree,
}

impl SledStore {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let db = sled::open(path).with_context(|| format!("opening sled at {}", path.display()))?;
    let blocks = db.open_tree(TREE_BLOCKS)?;
    info!(path = %path.display(), "sled store opened");
    Ok(Self { db, blocks })
  }

  pub fn get_block(&self, index: u64) -> Result<Option<Block>> {
    self
      .blocks
      .get(index.to_be_bytes())?
      .map(|bytes| decode(index, &bytes))
      .transpose()
  }

  pub fn tip_hash(&self) -> Result<Option<Hash>> {
    match self.blocks.last()? {
      Some((key, bytes)) => Ok(Some(decode(key_index(&key)?, &bytes)?.hash)),
      None => Ok(None),
    }
  }

  pub fn len(&self) -> usize {
    self.blocks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.blocks.is_empty()
  }

  /// Drops every stored block.
  pub fn clear(&self) -> Result<()> {
    self.blocks.clear()?;
    self.db.flush()?;
    Ok(())
  }
}

impl ChainStore for SledStore {
  fn put_block(&self, block: &Block) -> Result<()> {
    let bytes = bincode::serialize(block)?;
    self.blocks.insert(block.index.to_be_bytes(), bytes)?;
    self.db.flush()?;
    debug!(index = block.index, "block stored");
    Ok(())
  }

  fn load_blocks(&self) -> Result<Vec<Block>> {
    self
      .blocks
      .iter()
      .map(|entry| {
        let (key, bytes) = entry?;
        decode(key_index(&key)?, &bytes)
      })
      .collect()
  }

  fn replace_blocks(&self, blocks: &[Block]) -> Result<()> {
    let mut batch = Batch::default();
    for key in self.blocks.iter().keys() {
      batch.remove(key?);
    }
    for block in blocks {
      batch.insert(block.index.to_be_bytes().to_vec(), bincode::serialize(block)?);
    }
    self.blocks.apply_batch(batch)?;
    self.db.flush()?;
    info!(length = blocks.len(), "stored chain replaced");
    Ok(())
  }

  fn tip_height(&self) -> Result<Option<u64>> {
    match self.blocks.last()? {
      Some((key, _)) => Ok(Some(key_index(&key)?)),
      None => Ok(None),
    }
  }

  fn close(&self) -> Result<()> {
    self.db.flush()?;
    Ok(())
  }
}

fn key_index(key: &IVec) -> Result<u64> {
  let arr: [u8; 8] = key
    .as_ref()
    .try_into()
    .with_context(|| format!("block key of {} bytes", key.len()))?;
  Ok(u64::from_be_bytes(arr))
}

fn decode(index: u64, bytes: &[u8]) -> Result<Block> {
  bincode::deserialize(bytes).with_context(|| format!("decoding stored block {index}"))
}
