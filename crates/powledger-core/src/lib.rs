use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod chain;
pub mod config;
pub mod consensus;
pub mod constants;
pub mod engine;
pub mod error;
pub mod mine;
pub mod peers;
pub mod pool;
pub mod pow;

pub use chain::{Chain, ChainStore};
pub use config::EngineConfig;
pub use consensus::{ConsensusResolver, Resolution, ResolutionReport};
pub use engine::Engine;
pub use error::{
    ChainIntegrityError, ConsensusError, EngineError, MineError, PeerError, ValidationError,
};
pub use mine::Miner;
pub use peers::{ChainResponse, PeerClient, PeerSet};
pub use pool::TransactionPool;
pub use pow::CancelToken;

use constants::{COINBASE_SENDER, HASH_SIZE};

pub type Hash = [u8; HASH_SIZE];

/// SHA-256 of `bytes`.
pub fn digest(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&digest[..]);
    out
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// A value transfer waiting for, or included in, a block.
///
/// Transactions carry no identity: two equal transfers are indistinguishable and
/// nothing prevents the same transfer from being submitted twice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: u64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// Mining reward paid by the system address to `recipient`.
    pub fn coinbase(recipient: impl Into<String>, amount: u64) -> Self {
        Self::new(COINBASE_SENDER, recipient, amount)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sender.trim().is_empty() {
            return Err(ValidationError::EmptyField("sender"));
        }
        if self.recipient.trim().is_empty() {
            return Err(ValidationError::EmptyField("recipient"));
        }
        Ok(())
    }
}

/// One hash-linked chain entry. `hash` is derived from every other field and is
/// never part of the hashed content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    #[serde(with = "hex::serde")]
    pub previous_hash: Hash,
    #[serde(with = "hex::serde")]
    pub hash: Hash,
}

impl Block {
    /// Builds a block and seals it with the hash of its content.
    pub fn new(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        proof: u64,
        previous_hash: Hash,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            proof,
            previous_hash,
            hash: [0u8; HASH_SIZE],
        };
        block.hash = block.compute_hash();
        block
    }

    /// Canonical form of the block content: compact JSON, keys in lexicographic
    /// order, integers in decimal and hashes as lowercase hex.
    pub fn canonical_json(&self) -> String {
        let transactions: Vec<serde_json::Value> = self
            .transactions
            .iter()
            .map(|tx| {
                json!({
                    "amount": tx.amount,
                    "recipient": tx.recipient,
                    "sender": tx.sender,
                })
            })
            .collect();
        json!({
            "index": self.index,
            "previous_hash": hex::encode(self.previous_hash),
            "proof": self.proof,
            "timestamp": self.timestamp,
            "transactions": transactions,
        })
        .to_string()
    }

    pub fn compute_hash(&self) -> Hash {
        digest(self.canonical_json().as_bytes())
    }

    /// True when the stored hash still matches the content.
    pub fn is_sealed(&self) -> bool {
        self.hash == self.compute_hash()
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}
