use clap::Parser;
use powledger_core::{constants::DEFAULT_DIFFICULTY, Engine, EngineConfig, PeerSet};
use powledger_node::{
    constants::{DEFAULT_LISTEN, DEFAULT_MINING_REWARD, DEFAULT_PEER_TIMEOUT_MS},
    router, AppState, HttpPeerClient,
};
use powledger_storage::SledStore;
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "powledger-node")]
#[command(about = "Proof-of-work ledger node")]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:5000
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Data directory for sled. The chain lives in memory only when omitted.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Leading hex zeros required of a proof digest (1-64)
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u32,

    /// Reward paid to this node for each mined block; 0 disables it
    #[arg(long, default_value_t = DEFAULT_MINING_REWARD)]
    reward: u64,

    /// Per-peer timeout for chain fetches during consensus
    #[arg(long, default_value_t = DEFAULT_PEER_TIMEOUT_MS)]
    peer_timeout_ms: u64,

    /// Peer to register at startup; repeatable
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Search proofs on all cores
    #[arg(long)]
    parallel_mining: bool,

    /// Fixed node identifier; random when omitted
    #[arg(long)]
    node_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = EngineConfig::default()
        .with_difficulty(args.difficulty)
        .with_mining_reward((args.reward > 0).then_some(args.reward))
        .with_peer_timeout(Duration::from_millis(args.peer_timeout_ms))
        .with_parallel_mining(args.parallel_mining);
    if let Some(node_id) = args.node_id {
        config = config.with_node_id(node_id);
    }

    let peers = Arc::new(PeerSet::new());
    peers.register_all(&args.peers)?;
    let client = Arc::new(HttpPeerClient::new(config.peer_timeout)?);

    let engine = match &args.data_dir {
        Some(dir) => {
            let store = Arc::new(SledStore::open(dir)?);
            Engine::with_store(config, peers, client, store)?
        }
        None => Engine::new(config, peers, client)?,
    };
    let engine = Arc::new(engine);
    let app = router(AppState {
        engine: engine.clone(),
    });

    let addr: SocketAddr = args.listen.parse()?;
    info!(node_id = engine.node_id(), "powledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal(engine.clone()))
        .await?;

    engine.close()?;
    info!("powledger-node stopped");
    Ok(())
}

async fn shutdown_signal(engine: Arc<Engine>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
    engine.shutdown();
}
