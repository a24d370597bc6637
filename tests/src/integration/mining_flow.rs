//! # Mining Flow
//!
//! Admission through settlement on one node, with a real miner thread:
//!
//! 1. **Mempool (4) → Miner (6)**: a full active pool becomes a batch
//! 2. **Miner (6) → Reconciliation (5)**: the mined block is applied at the tip
//! 3. **Reconciliation (5) → Ledger (3)**: settlement moves the balances

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dc_03_ledger::Ledger;
    use dc_04_mempool::{MempoolConfig, TransactionPool};
    use dc_05_reconciliation::test_utils::test_service;
    use dc_05_reconciliation::{Acceptance, ChainParams, MinedOutcome, ReconciliationService};
    use dc_06_miner::{spawn_miner, BlockTemplate, MinerEvent};
    use shared_types::test_utils::{build_chain, demo_address, make_tx};
    use shared_types::{genesis_prior_hash, identity_from_seed, meets_difficulty, Tag, Transaction};
    use tokio::sync::mpsc;

    const N: usize = 4;
    const WAIT: Duration = Duration::from_secs(10);

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn node(difficulty: usize) -> ReconciliationService {
        ReconciliationService::new(
            ChainParams {
                txs_per_block: N,
                difficulty,
            },
            Ledger::with_demo_accounts(101, Tag::from_u64(100_000)),
            TransactionPool::new(MempoolConfig {
                transactions_per_block: N,
            }),
        )
    }

    /// Distinct senders and receivers so every balance moves exactly once.
    fn transfers() -> Vec<(u64, u64, u64)> {
        (0..N as u64).map(|i| (2 * i + 1, 2 * i + 2, 10 * (i + 1))).collect()
    }

    fn admit_all(service: &ReconciliationService, txs: &[Transaction]) -> bool {
        let mut ready = false;
        for tx in txs {
            ready = service.admit_transaction(tx.clone()).unwrap().ready_to_mine;
        }
        ready
    }

    async fn mine(service: &ReconciliationService, difficulty: usize) -> (u64, MinerEvent) {
        let job = service.prepare_mining().expect("pool should be ready");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let template = BlockTemplate::new(
            job.prior_hash,
            job.height,
            identity_from_seed("jfv47"),
            job.batch.transactions,
        );
        let handle = spawn_miner(job.batch.id, template, difficulty, tx).unwrap();
        let event = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        handle.stop();
        (job.batch.id, event)
    }

    // =============================================================================
    // INTEGRATION TESTS: ADMISSION → MINING → SETTLEMENT
    // =============================================================================

    #[tokio::test]
    async fn test_full_pool_is_mined_into_genesis_and_settled() {
        let service = node(1);
        let txs: Vec<Transaction> = transfers()
            .iter()
            .map(|&(from, to, amount)| make_tx(from, to, amount, from))
            .collect();

        assert!(admit_all(&service, &txs));

        let (batch_id, event) = mine(&service, 1).await;
        let MinerEvent::Mined(mined) = event else {
            panic!("expected a mined block, got {event:?}");
        };
        assert_eq!(mined.batch_id, batch_id);
        assert!(meets_difficulty(&mined.block.hash(), 1));

        let block = match service.apply_mined_block(batch_id, mined.block).unwrap() {
            MinedOutcome::Applied(block) => block,
            MinedOutcome::Discarded => panic!("mined block was discarded"),
        };
        assert_eq!(block.height().to_string(), "0".repeat(32));
        assert_eq!(block.transactions.len(), N);
        assert_eq!(service.chain_len(), 1);

        for (from, to, amount) in transfers() {
            assert_eq!(
                service.balance(&demo_address(from)),
                Some(Tag::from_u64(100_000 - amount))
            );
            assert_eq!(
                service.balance(&demo_address(to)),
                Some(Tag::from_u64(100_000 + amount))
            );
        }

        let stats = service.pool_stats();
        assert_eq!(stats.active, 0);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.settled, N);
    }

    #[tokio::test]
    async fn test_mined_block_is_discarded_after_peer_block_wins_the_height() {
        let service = test_service(N);
        let peer_genesis = build_chain(1, N, 7).remove(0);
        let txs: Vec<Transaction> = (0..N as u64).map(|i| make_tx(40 + i, 60 + i, 3, i)).collect();
        assert!(admit_all(&service, &txs));

        // The batch leaves the pool before the peer block lands.
        let job = service.prepare_mining().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let template = BlockTemplate::new(
            genesis_prior_hash(),
            Tag::zero(),
            identity_from_seed("jfv47"),
            job.batch.transactions.clone(),
        );
        let handle = spawn_miner(job.batch.id, template, 0, tx).unwrap();

        match service.accept_new_block(peer_genesis.clone()).unwrap() {
            Acceptance::Applied(outcome) => {
                assert_eq!(outcome.preempted_batch, Some(job.batch.id));
            }
            other => panic!("expected the peer genesis to apply, got {other:?}"),
        }

        let event = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        handle.stop();
        let MinerEvent::Mined(mined) = event else {
            panic!("expected a mined block, got {event:?}");
        };
        assert_eq!(
            service.apply_mined_block(mined.batch_id, mined.block).unwrap(),
            MinedOutcome::Discarded
        );

        // Our transactions are back in the active pool, ready for height 1.
        assert_eq!(service.tip().map(|(_, hash)| hash), Some(peer_genesis.hash()));
        assert_eq!(service.pool_stats().active, N);
        let next = service.prepare_mining().unwrap();
        assert_eq!(next.height, Tag::from_u64(1));
        assert_eq!(next.prior_hash, peer_genesis.hash());
    }
}
