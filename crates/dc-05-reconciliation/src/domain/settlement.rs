//! Settlement: the single place ledger and mempool follow a chain rewrite.

use dc_03_ledger::{Direction, Ledger};
use dc_04_mempool::TransactionPool;
use shared_types::SharedBlock;
use tracing::debug;

/// Undo `removed` and apply `added`.
///
/// Both slices are oldest first. Removed blocks are undone newest first (the
/// inverse of the order they were applied in) and their transactions return
/// to the active pool. Added blocks are applied oldest first and their
/// transactions become settled.
pub fn reconcile_transactions(
    added: &[SharedBlock],
    removed: &[SharedBlock],
    ledger: &mut Ledger,
    pool: &mut TransactionPool,
) {
    for block in removed.iter().rev() {
        ledger.execute_all(&block.transactions, Direction::Reverse);
        pool.demote_to_active(&block.transactions);
    }
    for block in added {
        ledger.execute_all(&block.transactions, Direction::Forward);
        pool.promote_to_settled(&block.transactions);
    }
    debug!(
        "[dc-05] settled: +{} blocks, -{} blocks, active={}, settled={}",
        added.len(),
        removed.len(),
        pool.active_len(),
        pool.settled_len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use dc_04_mempool::MempoolConfig;
    use shared_types::test_utils::{build_chain, demo_address};
    use shared_types::Tag;
    use std::sync::Arc;

    fn fixtures() -> (Ledger, TransactionPool) {
        (
            Ledger::with_demo_accounts(101, Tag::from_u64(100_000)),
            TransactionPool::new(MempoolConfig {
                transactions_per_block: 2,
            }),
        )
    }

    #[test]
    fn test_added_blocks_execute_and_settle() {
        let (mut ledger, mut pool) = fixtures();
        let blocks: Vec<SharedBlock> = build_chain(2, 2, 0).into_iter().map(Arc::new).collect();
        reconcile_transactions(&blocks, &[], &mut ledger, &mut pool);

        assert_eq!(pool.settled_len(), 4);
        // Each block moves 1 from account 0 to 1 and from 1 to 2.
        assert_eq!(ledger.balance(&demo_address(0)), Some(Tag::from_u64(99_998)));
        assert_eq!(ledger.balance(&demo_address(1)), Some(Tag::from_u64(100_000)));
        assert_eq!(ledger.balance(&demo_address(2)), Some(Tag::from_u64(100_002)));
    }

    #[test]
    fn test_removed_blocks_reverse_and_reactivate() {
        let (mut ledger, mut pool) = fixtures();
        let blocks: Vec<SharedBlock> = build_chain(2, 2, 0).into_iter().map(Arc::new).collect();
        reconcile_transactions(&blocks, &[], &mut ledger, &mut pool);
        reconcile_transactions(&[], &blocks[1..], &mut ledger, &mut pool);

        assert_eq!(pool.settled_len(), 2);
        assert_eq!(pool.active_len(), 2);
        assert_eq!(ledger.balance(&demo_address(0)), Some(Tag::from_u64(99_999)));
        assert_eq!(ledger.balance(&demo_address(2)), Some(Tag::from_u64(100_001)));
    }

    #[test]
    fn test_swap_fork_restores_then_applies() {
        let (mut ledger, mut pool) = fixtures();
        let ours: Vec<SharedBlock> = build_chain(2, 2, 0).into_iter().map(Arc::new).collect();
        let theirs: Vec<SharedBlock> = build_chain(2, 2, 1).into_iter().map(Arc::new).collect();
        reconcile_transactions(&ours, &[], &mut ledger, &mut pool);
        reconcile_transactions(&theirs, &ours, &mut ledger, &mut pool);

        // Our four transactions are pending again, theirs are settled.
        assert_eq!(pool.active_len(), 4);
        assert_eq!(pool.settled_len(), 4);
        for tx in theirs.iter().flat_map(|b| b.transactions.iter()) {
            assert!(pool.is_settled(&tx.fingerprint()));
        }
    }
}
