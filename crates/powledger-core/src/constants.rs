use std::time::Duration;

pub const BYTE: usize = 8;
pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Bits covered by one hex character of a digest.
pub const BITS_PER_HEX_CHAR: u32 = 4;

pub const DEFAULT_DIFFICULTY: u32 = 4;
pub const MAX_DIFFICULTY: u32 = HASH_HEX_SIZE as u32;

pub const GENESIS_INDEX: u64 = 0;
pub const GENESIS_TIMESTAMP: u64 = 0;
pub const GENESIS_PROOF: u64 = 100;
pub const GENESIS_PREVIOUS_HASH: [u8; HASH_SIZE] = [0u8; HASH_SIZE];

/// Sender recorded on mining reward transactions.
pub const COINBASE_SENDER: &str = "0";

pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);

/// How many candidates the sequential search tries between cancellation checks.
pub const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Candidates the parallel search hands to the thread pool at a time.
pub const PARALLEL_BATCH_SIZE: u64 = 1 << 14;
