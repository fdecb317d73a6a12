//! Proof-of-work predicate and cancellation for the proof search.

use crate::constants::{BITS_PER_HEX_CHAR, BYTE};
use crate::{digest, Hash};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += BYTE as u32;
        } else {
            total += b.leading_zeros();
            break;
        }
    }
    total
}

/// Digest of the decimal concatenation of `previous_proof` and `proof`.
pub fn proof_digest(previous_proof: u64, proof: u64) -> Hash {
    digest(format!("{previous_proof}{proof}").as_bytes())
}

/// Holds when the proof digest, rendered as hex, starts with `difficulty` zeros.
pub fn is_valid_proof(previous_proof: u64, proof: u64, difficulty: u32) -> bool {
    let required = difficulty.saturating_mul(BITS_PER_HEX_CHAR);
    count_leading_zero_bits(&proof_digest(previous_proof, proof)) >= required
}

/// Cooperative cancellation flag for a running proof search.
///
/// Children observe their own flag and every ancestor's, so cancelling a parent
/// stops all searches started from it.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    ancestors: Vec<Arc<AtomicBool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(Arc::clone(&self.flag));
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            ancestors,
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self.ancestors.iter().any(|a| a.load(Ordering::Relaxed))
    }

    /// Cancels the token when the returned guard is dropped.
    pub fn drop_guard(self) -> CancelOnDrop {
        CancelOnDrop { token: self }
    }
}

#[derive(Debug)]
pub struct CancelOnDrop {
    token: CancelToken,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
