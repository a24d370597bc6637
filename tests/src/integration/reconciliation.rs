//! # Reconciliation Scenarios
//!
//! Multi-node chain reconciliation driven in memory. Each node is a
//! `ReconciliationService`; a peer answers ancestor-search requests through
//! `ServiceSource`, which stands in for the GET_HASH / GET_BLOCK round trips.
//!
//! ## Flows Tested
//!
//! 1. **Deep merge**: forks diverging below the tip converge on one history
//! 2. **Propagate-only**: a stale block only yields settled transactions
//! 3. **Order independence**: any arrival order ends on the highest chain
//! 4. **Rollback safety**: failed searches leave the chain untouched

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dc_05_reconciliation::test_utils::{
        load_chain, test_service, ServiceSource, UnresponsiveSource,
    };
    use dc_05_reconciliation::{
        Acceptance, CommitOutcome, Disposition, ReconcileError, ReconciliationService, Step,
    };
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use shared_types::test_utils::{build_chain, demo_address, extend_chain, make_tx, seal_block};
    use shared_types::{sha256, Block, Hash32, Tag};

    const N: usize = 4;
    const ROUND: Duration = Duration::from_secs(5);

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn node_with(blocks: &[Block]) -> ReconciliationService {
        let service = test_service(N);
        load_chain(&service, blocks);
        service
    }

    fn hashes(blocks: &[Block]) -> Vec<Hash32> {
        blocks.iter().map(Block::hash).collect()
    }

    /// Offer `block` to `node`; run any resulting search against `peer`.
    async fn deliver(
        node: &ReconciliationService,
        block: Block,
        peer: &ReconciliationService,
    ) -> Result<Option<CommitOutcome>, ReconcileError> {
        match node.accept_new_block(block)? {
            Acceptance::Applied(outcome) => Ok(Some(outcome)),
            Acceptance::Search(search, request) => {
                let mut source = ServiceSource::new(peer);
                node.drive_search(search, Step::Send(request), &mut source, ROUND)
                    .await
                    .map(Some)
            }
            Acceptance::Propagate(_) | Acceptance::Ignored(_) => Ok(None),
        }
    }

    /// Two six-block chains (heights 0..=6) sharing heights 0..=2.
    fn diverging_pair() -> (Vec<Block>, Vec<Block>) {
        let common = build_chain(3, N, 0);
        (
            extend_chain(&common, 4, N, 1),
            extend_chain(&common, 4, N, 2),
        )
    }

    // =============================================================================
    // INTEGRATION TESTS: DEEP MERGE
    // =============================================================================

    #[tokio::test]
    async fn test_diverged_nodes_exchange_block_six_and_converge() {
        let (chain_a, chain_b) = diverging_pair();

        // Both nodes stand at height 5; each peer answers from its own
        // height-5 history.
        let node_a = node_with(&chain_a[..6]);
        let node_b = node_with(&chain_b[..6]);
        let view_a = node_with(&chain_a[..6]);
        let view_b = node_with(&chain_b[..6]);

        let outcome_a = deliver(&node_a, chain_b[6].clone(), &view_b)
            .await
            .unwrap()
            .unwrap();
        let outcome_b = deliver(&node_b, chain_a[6].clone(), &view_a)
            .await
            .unwrap()
            .unwrap();

        for outcome in [&outcome_a, &outcome_b] {
            // Divergence at height 3: heights 3..=5 rolled back, 3..=6 adopted.
            assert_eq!(outcome.removed.len(), 3);
            assert_eq!(outcome.removed[0].height(), Tag::from_u64(3));
            assert_eq!(outcome.added.len(), 4);
            assert_eq!(outcome.added[0].height(), Tag::from_u64(3));
            assert_eq!(outcome.added[3].height(), Tag::from_u64(6));
        }
        assert_eq!(node_a.chain_hashes(), hashes(&chain_b));
        assert_eq!(node_b.chain_hashes(), hashes(&chain_a));

        // Each now announces its new tip. Equal height: the smaller hash wins
        // on both sides, so exactly one node searches again.
        let tip_a = node_a.block_at(&Tag::from_u64(6)).unwrap();
        let tip_b = node_b.block_at(&Tag::from_u64(6)).unwrap();
        let accept_a = node_a.accept_new_block((*tip_b).clone()).unwrap();
        let accept_b = node_b.accept_new_block((*tip_a).clone()).unwrap();

        match (accept_a, accept_b) {
            (Acceptance::Search(search, request), Acceptance::Ignored(Disposition::KeepLocal)) => {
                let mut source = ServiceSource::new(&node_b);
                node_a
                    .drive_search(search, Step::Send(request), &mut source, ROUND)
                    .await
                    .unwrap();
            }
            (Acceptance::Ignored(Disposition::KeepLocal), Acceptance::Search(search, request)) => {
                let mut source = ServiceSource::new(&node_a);
                node_b
                    .drive_search(search, Step::Send(request), &mut source, ROUND)
                    .await
                    .unwrap();
            }
            other => panic!("expected exactly one search, got {other:?}"),
        }

        let winner = chain_a[6].hash().min(chain_b[6].hash());
        assert_eq!(node_a.tip().map(|(_, h)| h), Some(winner));
        assert_eq!(node_b.tip().map(|(_, h)| h), Some(winner));
        assert_eq!(node_a.chain_hashes(), node_b.chain_hashes());
    }

    #[tokio::test]
    async fn test_merge_moves_balances_to_the_adopted_history() {
        let (chain_a, chain_b) = diverging_pair();
        let node = node_with(&chain_a[..6]);
        let peer = node_with(&chain_b[..6]);
        let reference = node_with(&chain_b);

        deliver(&node, chain_b[6].clone(), &peer).await.unwrap().unwrap();

        for i in 0..N as u64 + 1 {
            assert_eq!(
                node.balance(&demo_address(i)),
                reference.balance(&demo_address(i))
            );
        }
    }

    // =============================================================================
    // INTEGRATION TESTS: PROPAGATE-ONLY
    // =============================================================================

    #[test]
    fn test_stale_block_yields_only_its_settled_transaction() {
        let chain = build_chain(6, N, 0);
        let node = node_with(&chain);
        let before = node.chain_hashes();

        let settled = chain[3].transactions[0].clone();
        let stale = seal_block(
            chain[2].hash(),
            Tag::from_u64(3),
            sha256(b"stale-miner"),
            vec![
                settled.clone(),
                make_tx(70, 71, 1, 9_001),
                make_tx(72, 73, 1, 9_002),
                make_tx(74, 75, 1, 9_003),
            ],
            0,
        );

        match node.accept_new_block(stale).unwrap() {
            Acceptance::Propagate(txs) => assert_eq!(txs, vec![settled]),
            other => panic!("expected propagate-only, got {other:?}"),
        }
        assert_eq!(node.chain_hashes(), before);
        assert_eq!(node.chain_len(), 6);
    }

    // =============================================================================
    // PROPERTIES
    // =============================================================================

    #[derive(Debug, Clone, Copy)]
    enum Sender {
        Main,
        Fork,
    }

    #[tokio::test]
    async fn test_arrival_order_does_not_change_the_final_tip() {
        let main = build_chain(6, N, 0);
        let fork = extend_chain(&main[..3], 2, N, 9);
        let main_peer = node_with(&main);
        let fork_peer = node_with(&fork);

        let mut events: Vec<(Block, Sender)> = main
            .iter()
            .map(|b| (b.clone(), Sender::Main))
            .chain(fork[3..].iter().map(|b| (b.clone(), Sender::Fork)))
            .collect();

        let mut orders = vec![events.clone()];
        events.reverse();
        orders.push(events.clone());
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..8 {
            events.shuffle(&mut rng);
            orders.push(events.clone());
        }

        for order in orders {
            let node = test_service(N);
            for (block, sender) in &order {
                let peer = match sender {
                    Sender::Main => &main_peer,
                    Sender::Fork => &fork_peer,
                };
                // Losing forks may fail to link; that must not matter.
                let _ = deliver(&node, block.clone(), peer).await;
            }
            let heights: Vec<Tag> = order.iter().map(|(b, _)| b.height()).collect();
            assert_eq!(
                node.chain_hashes(),
                hashes(&main),
                "arrival heights {heights:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_searches_leave_the_chain_untouched() {
        let (chain_a, chain_b) = diverging_pair();
        let node = node_with(&chain_a[..6]);
        let hashes_before = node.chain_hashes();
        let stats_before = node.pool_stats();
        let balances_before: Vec<Option<Tag>> =
            (0..10).map(|i| node.balance(&demo_address(i))).collect();

        // First peer never answers.
        let Acceptance::Search(search, request) = node.accept_new_block(chain_b[6].clone()).unwrap()
        else {
            panic!("expected a search");
        };
        let err = node
            .drive_search(search, Step::Send(request), &mut UnresponsiveSource, ROUND)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Timeout { .. }));

        // Second peer has nothing to offer.
        let empty = test_service(N);
        let Acceptance::Search(search, request) = node.accept_new_block(chain_b[6].clone()).unwrap()
        else {
            panic!("expected a search");
        };
        let mut source = ServiceSource::new(&empty);
        let err = node
            .drive_search(search, Step::Send(request), &mut source, ROUND)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::PeerUnavailable(_)));

        assert_eq!(node.chain_hashes(), hashes_before);
        assert_eq!(node.pool_stats(), stats_before);
        let balances_after: Vec<Option<Tag>> =
            (0..10).map(|i| node.balance(&demo_address(i))).collect();
        assert_eq!(balances_after, balances_before);
    }
}
