use thiserror::Error;

#[derive(Debug, Error)]
pub enum MinerError {
    #[error("Failed to spawn miner thread: {0}")]
    Spawn(#[from] std::io::Error),
}
