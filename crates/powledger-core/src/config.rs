use crate::{
    constants::{DEFAULT_DIFFICULTY, DEFAULT_PEER_TIMEOUT, MAX_DIFFICULTY},
    error::ValidationError,
};
use std::time::Duration;

/// Settings for one running node's engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Leading hex zeros required of a proof digest.
    pub difficulty: u32,
    /// Amount paid to `node_id` for every mined block. `None` disables the reward.
    pub mining_reward: Option<u64>,
    pub node_id: String,
    /// Upper bound on a single peer's chain fetch.
    pub peer_timeout: Duration,
    pub parallel_mining: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: None,
            node_id: generate_node_id(),
            peer_timeout: DEFAULT_PEER_TIMEOUT,
            parallel_mining: false,
        }
    }
}

impl EngineConfig {
    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_mining_reward(mut self, reward: Option<u64>) -> Self {
        self.mining_reward = reward;
        self
    }

    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = node_id.into();
        self
    }

    pub fn with_peer_timeout(mut self, timeout: Duration) -> Self {
        self.peer_timeout = timeout;
        self
    }

    pub fn with_parallel_mining(mut self, parallel: bool) -> Self {
        self.parallel_mining = parallel;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.difficulty == 0 || self.difficulty > MAX_DIFFICULTY {
            return Err(ValidationError::Difficulty {
                got: self.difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        if self.node_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("node_id"));
        }
        Ok(())
    }
}

/// Random 128-bit node identifier as 32 hex characters.
pub fn generate_node_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.difficulty, 4);
        assert_eq!(config.mining_reward, None);
        assert_eq!(config.peer_timeout, Duration::from_secs(5));
        assert_eq!(config.node_id.len(), 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn node_ids_are_unique() {
        assert_ne!(generate_node_id(), generate_node_id());
    }

    #[test]
    fn rejects_out_of_range_difficulty() {
        for difficulty in [0, 65] {
            let err = EngineConfig::default()
                .with_difficulty(difficulty)
                .validate()
                .unwrap_err();
            assert_eq!(
                err,
                ValidationError::Difficulty {
                    got: difficulty,
                    max: 64
                }
            );
        }
        assert!(EngineConfig::default().with_difficulty(64).validate().is_ok());
    }

    #[test]
    fn rejects_blank_node_id() {
        assert_eq!(
            EngineConfig::default().with_node_id(" ").validate(),
            Err(ValidationError::EmptyField("node_id"))
        );
    }
}
