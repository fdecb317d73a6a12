//! Longest-valid-chain resolution across known peers.

use crate::{
    chain::Chain,
    error::{ConsensusError, PeerError},
    peers::{ChainResponse, PeerClient},
    Block,
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// A longer valid chain was adopted.
    Replaced,
    /// The local chain stays as it is.
    Authoritative,
}

/// Aggregate result of one resolution round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub outcome: Resolution,
    /// Local chain length after the round.
    pub length: u64,
    /// Local chain after the round, copied under the same lock that decided it.
    #[serde(skip)]
    pub chain: Vec<Block>,
    /// Peer whose chain was adopted.
    pub source: Option<String>,
    pub peers_polled: usize,
    /// Unreachable, timed out or malformed.
    pub peers_failed: usize,
    /// Offered a longer chain that failed validation.
    pub peers_rejected: usize,
}

/// Outcome of fetching one peer's chain.
#[derive(Debug)]
pub struct PeerPoll {
    pub peer: String,
    pub result: Result<ChainResponse, PeerError>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub peer: String,
    pub chain: Vec<Block>,
}

#[derive(Debug, Default)]
pub struct Round {
    pub candidate: Option<Candidate>,
    pub peers_polled: usize,
    pub peers_failed: usize,
    pub peers_rejected: usize,
}

impl Round {
    pub fn report(&self, outcome: Resolution, chain: Vec<Block>) -> ResolutionReport {
        ResolutionReport {
            outcome,
            length: chain.len() as u64,
            chain,
            source: match outcome {
                Resolution::Replaced => self.candidate.as_ref().map(|c| c.peer.clone()),
                Resolution::Authoritative => None,
            },
            peers_polled: self.peers_polled,
            peers_failed: self.peers_failed,
            peers_rejected: self.peers_rejected,
        }
    }
}

pub struct ConsensusResolver {
    client: Arc<dyn PeerClient>,
    difficulty: u32,
    timeout: Duration,
}

impl ConsensusResolver {
    pub fn new(client: Arc<dyn PeerClient>, difficulty: u32, timeout: Duration) -> Self {
        Self {
            client,
            difficulty,
            timeout,
        }
    }

    /// Fetches every peer's chain concurrently, each bounded by the per-peer
    /// timeout. Results come back sorted by peer address.
    pub async fn poll(&self, peers: &[String]) -> Result<Vec<PeerPoll>, ConsensusError> {
        let mut tasks = JoinSet::new();
        for peer in peers {
            let client = Arc::clone(&self.client);
            let peer = peer.clone();
            let timeout = self.timeout;
            tasks.spawn(async move {
                let result = fetch_with_timeout(client.as_ref(), &peer, timeout).await;
                PeerPoll { peer, result }
            });
        }

        let mut polls = Vec::with_capacity(peers.len());
        while let Some(joined) = tasks.join_next().await {
            polls.push(joined.map_err(|e| ConsensusError::PollTask(e.to_string()))?);
        }
        polls.sort_by(|a, b| a.peer.cmp(&b.peer));
        Ok(polls)
    }

    /// Polls `peers` and picks the longest valid chain strictly longer than
    /// `local_length`, if any.
    pub async fn find_longer_chain(
        &self,
        peers: &[String],
        local_length: u64,
    ) -> Result<Round, ConsensusError> {
        let polls = self.poll(peers).await?;
        Ok(select_longest(local_length, polls, self.difficulty))
    }
}

async fn fetch_with_timeout(
    client: &dyn PeerClient,
    peer: &str,
    timeout: Duration,
) -> Result<ChainResponse, PeerError> {
    let response = tokio::time::timeout(timeout, client.fetch_chain(peer))
        .await
        .map_err(|_| PeerError::Timeout {
            peer: peer.to_string(),
            timeout,
        })??;
    if response.length != response.chain.len() as u64 {
        return Err(PeerError::Malformed {
            peer: peer.to_string(),
            reason: format!(
                "declared length {} but sent {} blocks",
                response.length,
                response.chain.len()
            ),
        });
    }
    Ok(response)
}

/// Max-tracking selection in the given order: a response replaces the current
/// best only when strictly longer and independently valid. The longest valid
/// length always wins; among equal lengths the earliest response wins.
pub fn select_longest(local_length: u64, polls: Vec<PeerPoll>, difficulty: u32) -> Round {
    let mut round = Round {
        peers_polled: polls.len(),
        ..Round::default()
    };
    let mut max_length = local_length;

    for PeerPoll { peer, result } in polls {
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                warn!(%peer, error = %err, "excluding peer from consensus round");
                round.peers_failed += 1;
                continue;
            }
        };
        if response.length <= max_length {
            debug!(%peer, length = response.length, max_length, "peer chain not longer");
            continue;
        }
        if let Err(err) = Chain::validate(&response.chain, difficulty) {
            warn!(%peer, length = response.length, error = %err, "rejecting invalid peer chain");
            round.peers_rejected += 1;
            continue;
        }
        info!(%peer, length = response.length, "found longer valid chain");
        max_length = response.length;
        round.candidate = Some(Candidate {
            peer,
            chain: response.chain,
        });
    }
    round
}
