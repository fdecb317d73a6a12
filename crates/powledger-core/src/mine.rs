use crate::{
    constants::{CANCEL_CHECK_INTERVAL, PARALLEL_BATCH_SIZE},
    error::MineError,
    pow::{is_valid_proof, CancelToken},
};
use rayon::prelude::*;
use tracing::debug;

/// Brute-force proof-of-work search. Holds no shared state; safe to run while
/// the chain is being read elsewhere.
#[derive(Clone, Copy, Debug)]
pub struct Miner {
    difficulty: u32,
    parallel: bool,
}

impl Miner {
    pub fn new(difficulty: u32) -> Self {
        Self {
            difficulty,
            parallel: false,
        }
    }

    /// Spread the search across the rayon thread pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn is_valid_proof(&self, previous_proof: u64, proof: u64) -> bool {
        is_valid_proof(previous_proof, proof, self.difficulty)
    }

    /// Runs the configured search strategy. Both strategies return the smallest
    /// valid proof.
    pub fn search(&self, previous_proof: u64, cancel: &CancelToken) -> Result<u64, MineError> {
        if self.parallel {
            self.find_proof_parallel(previous_proof, cancel)
        } else {
            self.find_proof(previous_proof, cancel)
        }
    }

    /// Increments a candidate from 0 until the proof predicate holds.
    pub fn find_proof(&self, previous_proof: u64, cancel: &CancelToken) -> Result<u64, MineError> {
        let mut proof = 0u64;
        loop {
            if proof % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                debug!(previous_proof, tried = proof, "proof search cancelled");
                return Err(MineError::Cancelled);
            }
            if self.is_valid_proof(previous_proof, proof) {
                return Ok(proof);
            }
            proof = proof
                .checked_add(1)
                .ok_or(MineError::NonceExhausted { previous_proof })?;
        }
    }

    /// Parallel search in consecutive batches of [`PARALLEL_BATCH_SIZE`]
    /// candidates. Every thread works on the same batch, and `find_first` keeps
    /// the result identical to the sequential search.
    pub fn find_proof_parallel(
        &self,
        previous_proof: u64,
        cancel: &CancelToken,
    ) -> Result<u64, MineError> {
        let mut start = 0u64;
        loop {
            if cancel.is_cancelled() {
                debug!(previous_proof, tried = start, "parallel proof search cancelled");
                return Err(MineError::Cancelled);
            }
            let end = start.saturating_add(PARALLEL_BATCH_SIZE - 1);
            let found = (start..=end)
                .into_par_iter()
                .find_first(|proof| cancel.is_cancelled() || self.is_valid_proof(previous_proof, *proof));

            if cancel.is_cancelled() {
                debug!(previous_proof, tried = start, "parallel proof search cancelled");
                return Err(MineError::Cancelled);
            }
            if let Some(proof) = found {
                return Ok(proof);
            }
            start = end
                .checked_add(1)
                .ok_or(MineError::NonceExhausted { previous_proof })?;
        }
    }
}
