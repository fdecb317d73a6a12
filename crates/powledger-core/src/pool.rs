use crate::{error::ValidationError, Transaction};
use parking_lot::Mutex;

/// Pending transactions awaiting the next block.
#[derive(Debug, Default)]
pub struct TransactionPool {
    pending: Mutex<Vec<Transaction>>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `tx` and returns `next_block_index`, the block it is expected to land in.
    pub fn submit(&self, tx: Transaction, next_block_index: u64) -> Result<u64, ValidationError> {
        tx.validate()?;
        self.pending.lock().push(tx);
        Ok(next_block_index)
    }

    /// Takes the whole pool, leaving it empty.
    pub fn drain(&self) -> Vec<Transaction> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Puts drained transactions back ahead of anything submitted since.
    pub fn restore(&self, mut txs: Vec<Transaction>) {
        if txs.is_empty() {
            return;
        }
        let mut pending = self.pending.lock();
        txs.append(&mut pending);
        *pending = txs;
    }

    pub fn pending(&self) -> Vec<Transaction> {
        self.pending.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
