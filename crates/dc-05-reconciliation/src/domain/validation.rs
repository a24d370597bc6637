//! Stateless block checks applied to every block received from a peer.

use shared_types::{genesis_prior_hash, meets_difficulty, Block};

use super::entities::ChainParams;
use super::errors::{ReconcileError, Result};

/// Structure and proof-of-work. Linkage is checked by the caller.
pub fn validate_block(block: &Block, params: &ChainParams) -> Result<()> {
    let height = block.height();
    if block.transactions.len() != params.txs_per_block {
        return Err(ReconcileError::WrongTransactionCount {
            height,
            expected: params.txs_per_block,
            actual: block.transactions.len(),
        });
    }
    if block.recompute_hash() != block.hash() {
        return Err(ReconcileError::HashMismatch { height });
    }
    if !meets_difficulty(&block.hash(), params.difficulty) {
        return Err(ReconcileError::InsufficientWork {
            height,
            difficulty: params.difficulty,
        });
    }
    if height.is_zero() && block.prior_hash() != genesis_prior_hash() {
        return Err(ReconcileError::BadGenesisPrior);
    }
    Ok(())
}
