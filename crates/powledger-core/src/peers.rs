//! Known peers and the capability used to fetch their chains.

use crate::{
    error::{PeerError, ValidationError},
    Block,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Body of `GET <peer>/chain`, the only wire contract consensus depends on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: u64,
}

impl ChainResponse {
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len() as u64;
        Self { chain, length }
    }
}

/// Fetches a peer's current chain. Any transport may implement it.
#[async_trait]
pub trait PeerClient: Send + Sync {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, PeerError>;
}

/// Peer registry. The engine only ever reads it.
#[derive(Debug, Default)]
pub struct PeerSet {
    peers: RwLock<BTreeSet<String>>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one address and returns its normalized `host:port` form.
    pub fn register(&self, address: &str) -> Result<String, ValidationError> {
        let peer = normalize_peer_address(address)?;
        self.peers.write().insert(peer.clone());
        Ok(peer)
    }

    /// Registers every address or none of them.
    pub fn register_all<I, S>(&self, addresses: I) -> Result<Vec<String>, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized = addresses
            .into_iter()
            .map(|a| normalize_peer_address(a.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.peers.write().extend(normalized.iter().cloned());
        Ok(normalized)
    }

    /// Sorted copy of the current peers.
    pub fn snapshot(&self) -> Vec<String> {
        self.peers.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

/// Reduces `http://host:port/` or `host:port` to `host:port`. Peers are fetched
/// over plain http, so `https://` addresses are refused.
pub fn normalize_peer_address(address: &str) -> Result<String, ValidationError> {
    let invalid = || ValidationError::InvalidPeerAddress(address.to_string());

    let trimmed = address.trim();
    if trimmed.starts_with("https://") {
        return Err(ValidationError::UnsupportedScheme(address.to_string()));
    }
    let rest = trimmed.strip_prefix("http://").unwrap_or(trimmed);
    let authority = rest.split('/').next().unwrap_or_default();

    if authority.is_empty()
        || authority.contains("://")
        || authority
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '@' | '?' | '#'))
    {
        return Err(invalid());
    }
    if let Some((host, port)) = authority.rsplit_once(':') {
        if host.is_empty() || port.parse::<u16>().is_err() {
            return Err(invalid());
        }
    }
    Ok(authority.to_ascii_lowercase())
}
