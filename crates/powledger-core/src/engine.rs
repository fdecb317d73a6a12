//! The node's ledger engine: owns the chain and the pool, mines blocks and runs
//! consensus rounds.
//!
//! Locking: the chain sits behind a single read/write lock. Every path that
//! touches both the chain and the pool takes the chain lock first. A mine holds
//! the chain write lock across drain, persist and append, so a concurrent submit
//! either lands before the drain or waits and lands in the next block. The proof
//! search itself runs on a blocking worker with no lock held.

use crate::{
    chain::{Chain, ChainStore},
    config::EngineConfig,
    consensus::{ConsensusResolver, Resolution, ResolutionReport},
    error::{ChainIntegrityError, ConsensusError, EngineError, MineError},
    mine::Miner,
    peers::{PeerClient, PeerSet},
    pool::TransactionPool,
    pow::CancelToken,
    unix_now, Block, Transaction,
};
use parking_lot::{Mutex, RwLock};
use std::{sync::Arc, time::Instant};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info, warn};

pub struct Engine {
    config: EngineConfig,
    chain: RwLock<Chain>,
    pool: TransactionPool,
    peers: Arc<PeerSet>,
    resolver: ConsensusResolver,
    miner: Miner,
    store: Option<Arc<dyn ChainStore>>,
    /// Serializes mines so concurrent requests queue instead of racing.
    mining: tokio::sync::Mutex<()>,
    shutdown: CancelToken,
    active_search: Mutex<Option<CancelToken>>,
}

impl Engine {
    /// In-memory engine starting from genesis.
    pub fn new(
        config: EngineConfig,
        peers: Arc<PeerSet>,
        client: Arc<dyn PeerClient>,
    ) -> Result<Self, EngineError> {
        Self::build(config, peers, client, None)
    }

    /// Engine backed by `store`: resumes the stored chain, or seeds it with genesis.
    pub fn with_store(
        config: EngineConfig,
        peers: Arc<PeerSet>,
        client: Arc<dyn PeerClient>,
        store: Arc<dyn ChainStore>,
    ) -> Result<Self, EngineError> {
        Self::build(config, peers, client, Some(store))
    }

    fn build(
        config: EngineConfig,
        peers: Arc<PeerSet>,
        client: Arc<dyn PeerClient>,
        store: Option<Arc<dyn ChainStore>>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let chain = match &store {
            Some(store) => load_or_seed(store.as_ref(), config.difficulty)?,
            None => Chain::new(config.difficulty),
        };
        info!(
            node_id = %config.node_id,
            difficulty = config.difficulty,
            length = chain.len(),
            persistent = store.is_some(),
            "ledger engine ready"
        );

        Ok(Self {
            resolver: ConsensusResolver::new(client, config.difficulty, config.peer_timeout),
            miner: Miner::new(config.difficulty).parallel(config.parallel_mining),
            chain: RwLock::new(chain),
            pool: TransactionPool::new(),
            peers,
            store,
            mining: tokio::sync::Mutex::new(()),
            shutdown: CancelToken::new(),
            active_search: Mutex::new(None),
            config,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    pub fn peers(&self) -> &Arc<PeerSet> {
        &self.peers
    }

    /// Consistent copy of the chain.
    pub fn current_chain(&self) -> Vec<Block> {
        self.chain.read().blocks().to_vec()
    }

    pub fn chain_length(&self) -> u64 {
        self.chain.read().len() as u64
    }

    pub fn last_block(&self) -> Block {
        self.chain.read().last().clone()
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.pool.pending()
    }

    /// Queues a transaction and returns the index of the block it should land in.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<u64, EngineError> {
        let chain = self.chain.read();
        let index = self.pool.submit(tx, chain.next_index())?;
        debug!(index, "transaction queued");
        Ok(index)
    }

    /// Finds a proof for the current tip, then packages the pool into a new block.
    ///
    /// Dropping the returned future cancels the proof search.
    pub async fn mine(&self) -> Result<Block, EngineError> {
        let _serial = self.mining.lock().await;
        let parent = self.chain.read().last().clone();

        let cancel = self.shutdown.child();
        let active = ActiveSearch::start(&self.active_search, cancel.clone());
        let _abort_on_drop = cancel.clone().drop_guard();

        let miner = self.miner;
        let previous_proof = parent.proof;
        let started = Instant::now();
        let search =
            tokio::task::spawn_blocking(move || miner.search(previous_proof, &cancel)).await;
        drop(active);

        let proof = search.map_err(|e| MineError::Worker(e.to_string()))??;
        debug!(proof, elapsed = ?started.elapsed(), "proof found");
        match &self.store {
            Some(_) => blocking(|| self.commit(&parent, proof)),
            None => self.commit(&parent, proof),
        }
    }

    fn commit(&self, parent: &Block, proof: u64) -> Result<Block, EngineError> {
        let mut chain = self.chain.write();
        if chain.last().hash != parent.hash {
            warn!(
                parent = parent.index,
                tip = chain.last().index,
                "chain changed during the proof search, discarding block"
            );
            return Err(ChainIntegrityError::StaleTip {
                expected: parent.index,
            }
            .into());
        }

        let drained = self.pool.drain();
        let mut transactions = drained.clone();
        if let Some(reward) = self.config.mining_reward {
            transactions.push(Transaction::coinbase(self.config.node_id.clone(), reward));
        }
        let block = Block::new(chain.next_index(), unix_now(), transactions, proof, parent.hash);

        if let Err(err) = self.persist_append(&chain, &block) {
            self.pool.restore(drained);
            return Err(err);
        }
        chain.append(block.clone())?;
        info!(
            index = block.index,
            proof,
            txs = block.transactions.len(),
            hash = %block.hash_hex(),
            "new block forged"
        );
        Ok(block)
    }

    fn persist_append(&self, chain: &Chain, block: &Block) -> Result<(), EngineError> {
        chain.check_append(block)?;
        if let Some(store) = &self.store {
            store.put_block(block).map_err(EngineError::storage)?;
        }
        Ok(())
    }

    /// Adopts the longest valid peer chain if it beats the local one.
    pub async fn run_consensus(&self) -> Result<ResolutionReport, EngineError> {
        let local_length = self.chain_length();
        let peers = self.peers.snapshot();
        let round = self.resolver.find_longer_chain(&peers, local_length).await?;

        let Some(candidate) = round.candidate.as_ref() else {
            let chain = self.current_chain();
            info!(length = chain.len(), peers = round.peers_polled, "our chain is authoritative");
            return Ok(round.report(Resolution::Authoritative, chain));
        };

        let mut chain = self.chain.write();
        if candidate.chain.len() <= chain.len() {
            info!(
                peer = %candidate.peer,
                length = chain.len(),
                "local chain grew during the round, keeping it"
            );
            return Ok(round.report(Resolution::Authoritative, chain.blocks().to_vec()));
        }
        if let Some(store) = &self.store {
            blocking(|| store.replace_blocks(&candidate.chain))
                .map_err(|e| ConsensusError::Storage(format!("{e:#}")))?;
        }
        chain.replace(candidate.chain.clone());
        info!(peer = %candidate.peer, length = chain.len(), "local chain replaced");
        Ok(round.report(Resolution::Replaced, chain.blocks().to_vec()))
    }

    /// Cancels the proof search in progress, if any.
    pub fn abort_mining(&self) -> bool {
        match self.active_search.lock().as_ref() {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels the running search and every later one.
    pub fn shutdown(&self) {
        info!("ledger engine shutting down");
        self.shutdown.cancel();
    }

    pub fn close(&self) -> Result<(), EngineError> {
        match &self.store {
            Some(store) => store.close().map_err(EngineError::storage),
            None => Ok(()),
        }
    }
}

/// Publishes the running search's token for [`Engine::abort_mining`] and
/// withdraws it when dropped, including when the mine future is dropped.
struct ActiveSearch<'a> {
    slot: &'a Mutex<Option<CancelToken>>,
}

impl<'a> ActiveSearch<'a> {
    fn start(slot: &'a Mutex<Option<CancelToken>>, cancel: CancelToken) -> Self {
        *slot.lock() = Some(cancel);
        Self { slot }
    }
}

impl Drop for ActiveSearch<'_> {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}

/// Runs `f` without stalling the other tasks of a multi-threaded runtime.
/// Elsewhere, `f` simply runs in place.
fn blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

fn load_or_seed(store: &dyn ChainStore, difficulty: u32) -> Result<Chain, EngineError> {
    let blocks = store.load_blocks().map_err(EngineError::storage)?;
    if blocks.is_empty() {
        let chain = Chain::new(difficulty);
        store.put_block(chain.last()).map_err(EngineError::storage)?;
        return Ok(chain);
    }
    Ok(Chain::from_blocks(blocks, difficulty)?)
}
