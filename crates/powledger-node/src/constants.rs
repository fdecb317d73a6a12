use powledger_core::constants::DEFAULT_PEER_TIMEOUT;
use std::time::Duration;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:5000";
pub const DEFAULT_MINING_REWARD: u64 = 1;
pub const DEFAULT_PEER_TIMEOUT_MS: u64 = DEFAULT_PEER_TIMEOUT.as_millis() as u64;
/// Connect timeout for peer requests; the overall bound comes from the engine.
pub const PEER_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
