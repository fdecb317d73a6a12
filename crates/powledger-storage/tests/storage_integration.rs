mod helpers;

use helpers::{create_temp_store, mined_chain, teardown_store, TEST_DIFFICULTY};
use powledger_core::{
    chain::genesis_block, ChainStore, Chain, Engine, EngineConfig, PeerSet, Transaction,
};
use powledger_storage::SledStore;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn test_storage_integration() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    let blocks = mined_chain(20, 3, "alice");
    for block in &blocks {
        store.put_block(block)?;
    }

    for block in &blocks {
        let retrieved = store.get_block(block.index)?.expect("Block should exist");
        assert_eq!(&retrieved, block);
    }
    assert_eq!(store.tip_height()?, Some(19));
    assert_eq!(store.tip_hash()?, Some(blocks[19].hash));

    let loaded = store.load_blocks()?;
    assert_eq!(loaded, blocks);
    assert!(Chain::is_valid(&loaded, TEST_DIFFICULTY));

    teardown_store(temp_dir, store);
    Ok(())
}

#[tokio::test]
async fn test_storage_persistence() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().to_path_buf();
    let blocks = mined_chain(3, 1, "alice");
    {
        let store = SledStore::open(&db_path)?;
        for block in &blocks {
            store.put_block(block)?;
        }
        store.close()?;
    }
    // Re-open the store and verify the chain survived
    {
        let store = SledStore::open(&db_path)?;
        assert_eq!(store.load_blocks()?, blocks);
        assert_eq!(store.tip_height()?, Some(2));
    }

    temp_dir.close()?;
    let _ = fs::remove_dir_all(db_path);
    Ok(())
}

#[tokio::test]
async fn test_empty_store() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    assert!(store.is_empty());
    assert_eq!(store.tip_height()?, None);
    assert_eq!(store.tip_hash()?, None);
    assert!(store.load_blocks()?.is_empty());
    assert!(store.get_block(0)?.is_none());
    teardown_store(temp_dir, store);
    Ok(())
}

#[tokio::test]
async fn test_storage_edge_cases() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    store.put_block(&genesis_block())?;
    let retrieved = store.get_block(0)?.expect("Genesis should exist");
    assert!(retrieved.transactions.is_empty());

    // Very large block
    let large = mined_chain(2, 10_000, "bulk");
    store.put_block(&large[1])?;
    let retrieved_large = store.get_block(1)?.expect("Large block should exist");
    assert_eq!(retrieved_large.transactions.len(), 10_000);
    assert_eq!(retrieved_large, large[1]);
    assert!(retrieved_large.is_sealed());

    teardown_store(temp_dir, store);
    Ok(())
}

#[tokio::test]
async fn test_replace_shrinks_and_grows() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    let long = mined_chain(6, 1, "long");
    let short = mined_chain(3, 2, "short");

    store.replace_blocks(&long)?;
    assert_eq!(store.load_blocks()?, long);

    store.replace_blocks(&short)?;
    assert_eq!(store.load_blocks()?, short);
    assert_eq!(store.len(), 3);
    assert_eq!(store.tip_height()?, Some(2));
    assert!(store.get_block(5)?.is_none());

    let longer = mined_chain(8, 1, "longer");
    store.replace_blocks(&longer)?;
    assert_eq!(store.load_blocks()?, longer);

    teardown_store(temp_dir, store);
    Ok(())
}

#[tokio::test]
async fn test_storage_concurrency() -> anyhow::Result<()> {
    use tokio::task;

    let (temp_dir, store) = create_temp_store();
    let store = Arc::new(store);
    let blocks = mined_chain(30, 1, "alice");

    let mut handles = Vec::new();
    for block in blocks.clone() {
        let store = Arc::clone(&store);
        handles.push(task::spawn(async move { store.put_block(&block) }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(store.load_blocks()?, blocks);
    let store = Arc::try_unwrap(store).unwrap_or_else(|_| panic!("store still shared"));
    teardown_store(temp_dir, store);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_block_is_reported() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().to_path_buf();
    {
        let store = SledStore::open(&db_path)?;
        store.put_block(&genesis_block())?;
        store.close()?;
    }
    // Overwrite the stored bytes through raw sled
    {
        let sled_db = sled::open(&db_path)?;
        let blocks = sled_db.open_tree("blocks")?;
        let previous = blocks.insert(0u64.to_be_bytes(), vec![0u8; 10])?;
        assert!(previous.is_some(), "Expected to overwrite the genesis block");
        sled_db.flush()?;
    }
    let store = SledStore::open(&db_path)?;
    let err = store.load_blocks().unwrap_err();
    assert!(format!("{err:#}").contains("decoding stored block 0"));
    drop(store);

    temp_dir.close()?;
    let _ = fs::remove_dir_all(db_path);
    Ok(())
}

#[tokio::test]
async fn test_engine_round_trip_through_sled() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().to_path_buf();
    let config = EngineConfig::default()
        .with_difficulty(TEST_DIFFICULTY)
        .with_node_id("node-a");
    let mined = {
        let store = Arc::new(SledStore::open(&db_path)?);
        let engine = Engine::with_store(
            config.clone(),
            Arc::new(PeerSet::new()),
            Arc::new(NoPeers),
            store,
        )?;
        engine.submit_transaction(Transaction::new("alice", "bob", 3))?;
        engine.mine().await?;
        engine.mine().await?;
        engine.close()?;
        engine.current_chain()
    };

    let store = Arc::new(SledStore::open(&db_path)?);
    let engine = Engine::with_store(config, Arc::new(PeerSet::new()), Arc::new(NoPeers), store)?;
    assert_eq!(engine.current_chain(), mined);
    assert_eq!(engine.chain_length(), 3);
    drop(engine);

    temp_dir.close()?;
    let _ = fs::remove_dir_all(db_path);
    Ok(())
}

#[test]
fn test_storage_trait_compliance() {
    fn assert_store<T: ChainStore>() {}
    assert_store::<SledStore>();
}

struct NoPeers;

#[async_trait::async_trait]
impl powledger_core::PeerClient for NoPeers {
    async fn fetch_chain(
        &self,
        peer: &str,
    ) -> Result<powledger_core::ChainResponse, powledger_core::PeerError> {
        Err(powledger_core::PeerError::Unreachable {
            peer: peer.to_string(),
            reason: "no network in tests".into(),
        })
    }
}
