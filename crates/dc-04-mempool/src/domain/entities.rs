//! Mempool entities.

use shared_types::Transaction;

#[derive(Debug, Clone, Copy)]
pub struct MempoolConfig {
    /// Transactions per block (N). Mining becomes possible at this many.
    pub transactions_per_block: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            transactions_per_block: 50_000,
        }
    }
}

/// The miner's private snapshot, tagged so stale results can be detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningBatch {
    pub id: u64,
    pub transactions: Vec<Transaction>,
}

/// Successful admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Enough active transactions for a block and no batch in flight.
    pub ready_to_mine: bool,
}
