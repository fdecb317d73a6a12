//! Error taxonomy shared by the ledger engine and its collaborators.

use std::time::Duration;
use thiserror::Error;

/// A malformed transaction, peer address or request payload. Never changes state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("invalid peer address `{0}`")]
    InvalidPeerAddress(String),

    #[error("peer `{0}` must be reachable over plain http")]
    UnsupportedScheme(String),

    #[error("difficulty must be between 1 and {max}, got {got}")]
    Difficulty { got: u32, max: u32 },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// A block or chain that breaks hash linkage, content hashing or proof-of-work.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainIntegrityError {
    #[error("chain has no blocks")]
    Empty,

    #[error("block at position {position} carries index {found}")]
    IndexMismatch { position: u64, found: u64 },

    #[error("block {index} hash does not match its content")]
    HashMismatch { index: u64 },

    #[error("block {index} does not link to its predecessor")]
    BrokenLink { index: u64 },

    #[error("block {index} carries invalid proof {proof}")]
    InvalidProof { index: u64, proof: u64 },

    #[error("chain tip moved away from block {expected} during the proof search")]
    StaleTip { expected: u64 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MineError {
    #[error("proof search cancelled")]
    Cancelled,

    #[error("nonce space exhausted for previous proof {previous_proof}")]
    NonceExhausted { previous_proof: u64 },

    #[error("proof search worker failed: {0}")]
    Worker(String),
}

/// Failure talking to a single peer. Excludes that peer from the current round only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeerError {
    #[error("peer {peer} unreachable: {reason}")]
    Unreachable { peer: String, reason: String },

    #[error("peer {peer} timed out after {timeout:?}")]
    Timeout { peer: String, timeout: Duration },

    #[error("peer {peer} answered with status {status}")]
    Status { peer: String, status: u16 },

    #[error("peer {peer} sent a malformed response: {reason}")]
    Malformed { peer: String, reason: String },
}

impl PeerError {
    pub fn peer(&self) -> &str {
        match self {
            PeerError::Unreachable { peer, .. }
            | PeerError::Timeout { peer, .. }
            | PeerError::Status { peer, .. }
            | PeerError::Malformed { peer, .. } => peer,
        }
    }
}

/// Unexpected failure of a resolution round as a whole.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("peer poll task failed: {0}")]
    PollTask(String),

    #[error("failed to persist the replacement chain: {0}")]
    Storage(String),
}

/// Aggregate error returned by [`crate::engine::Engine`] operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    ChainIntegrity(#[from] ChainIntegrityError),

    #[error(transparent)]
    Mine(#[from] MineError),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn storage(err: anyhow::Error) -> Self {
        EngineError::Storage(format!("{err:#}"))
    }

    /// Machine-readable kind for surfacing to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::ChainIntegrity(_) => "chain_integrity",
            EngineError::Mine(_) => "mining",
            EngineError::Consensus(_) => "consensus",
            EngineError::Storage(_) => "storage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ChainIntegrityError::InvalidProof { index: 3, proof: 7 };
        assert_eq!(err.to_string(), "block 3 carries invalid proof 7");

        let err = ValidationError::Difficulty { got: 0, max: 64 };
        assert_eq!(err.to_string(), "difficulty must be between 1 and 64, got 0");
    }

    #[test]
    fn engine_error_kinds() {
        let err: EngineError = ValidationError::MissingField("sender").into();
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.to_string(), "missing field `sender`");

        let err: EngineError = ChainIntegrityError::Empty.into();
        assert_eq!(err.kind(), "chain_integrity");

        let err: EngineError = MineError::Cancelled.into();
        assert_eq!(err.kind(), "mining");

        let err: EngineError = ConsensusError::PollTask("boom".into()).into();
        assert_eq!(err.kind(), "consensus");

        let err = EngineError::storage(anyhow::anyhow!("disk full"));
        assert_eq!(err.kind(), "storage");
        assert_eq!(err.to_string(), "storage failure: disk full");
    }

    #[test]
    fn peer_error_names_peer() {
        let err = PeerError::Timeout {
            peer: "10.0.0.1:5000".into(),
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.peer(), "10.0.0.1:5000");
    }
}
