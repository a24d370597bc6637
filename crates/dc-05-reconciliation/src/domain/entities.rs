//! Reconciliation entities.

use dc_03_ledger::Ledger;
use dc_04_mempool::{MiningBatch, TransactionPool};
use shared_types::{Hash32, SharedBlock, Tag, Transaction};

/// Run-wide block parameters every node must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainParams {
    /// Exactly this many transactions per block (N).
    pub txs_per_block: usize,
    /// Required trailing zero hex digits in a block hash.
    pub difficulty: usize,
}

/// Ledger and mempool, guarded together.
///
/// Every chain mutation is followed by settlement touching both, so they
/// share one lock. Lock order is always chain first, then this.
#[derive(Debug)]
pub struct LedgerState {
    pub ledger: Ledger,
    pub pool: TransactionPool,
}

/// What a chain rewrite did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Blocks popped, oldest first.
    pub removed: Vec<SharedBlock>,
    /// Blocks pushed, oldest first.
    pub added: Vec<SharedBlock>,
    /// In-flight batch returned to the active pool; its miner must stop.
    pub preempted_batch: Option<u64>,
}

/// Result of offering a block to the engine.
#[derive(Debug)]
pub enum Acceptance {
    /// The chain changed.
    Applied(CommitOutcome),
    /// An ancestor search must run against the sending peer.
    Search(super::search::AncestorSearch, super::search::Request),
    /// Stale block: re-broadcast these locally settled transactions.
    Propagate(Vec<Transaction>),
    /// Nothing to do (duplicate, or a losing fork at equal height).
    Ignored(super::classify::Disposition),
}

/// Result of delivering a mined block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinedOutcome {
    Applied(SharedBlock),
    /// The tip moved or the batch was preempted; the block is dropped.
    Discarded,
}

/// A batch handed to the miner together with the tip it builds on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningJob {
    pub batch: MiningBatch,
    pub prior_hash: Hash32,
    pub height: Tag,
}

/// Mempool sizes, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub active: usize,
    pub in_flight: usize,
    pub settled: usize,
}
