//! # Network Flows
//!
//! Worker nodes on real loopback sockets.
//!
//! ## Flows Tested
//!
//! 1. **Transaction gossip → mining → block exchange**: two nodes end on the
//!    same tip after a client feeds one of them a block's worth of transactions
//! 2. **Propagate-only over the wire**: a stale SEND_BLOCK is answered by
//!    re-broadcasting its settled transaction to outbound peers
//! 3. **Rendezvous discovery**: registration, announcement and dial-back
//!    connect two workers to each other

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use dc_01_peer_io::{bind_listener, read_exact, send_now};
    use dc_05_reconciliation::test_utils::load_chain;
    use node_runtime::{Discovery, NodeConfig, Rendezvous, WorkerNode};
    use shared_types::test_utils::{build_chain, demo_address, make_tx, seal_block};
    use shared_types::{encode_send_block, sha256, Message, Tag};
    use tokio::net::TcpStream;
    use tokio::sync::watch;

    const WAIT: Duration = Duration::from_secs(15);

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn config(seed: &str, txs_per_block: usize, difficulty: usize) -> NodeConfig {
        let mut config = NodeConfig::default();
        config.identity_seed = seed.to_string();
        config.chain.transactions_per_block = txs_per_block;
        config.chain.difficulty = difficulty;
        config.workers.cores = 2;
        config
    }

    async fn manual_node(seed: &str, txs_per_block: usize, difficulty: usize) -> WorkerNode {
        WorkerNode::start(config(seed, txs_per_block, difficulty), &[0], Discovery::Manual)
            .await
            .unwrap()
    }

    /// Poll `check` until it holds or `WAIT` runs out.
    async fn eventually(mut check: impl FnMut() -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + WAIT;
        while tokio::time::Instant::now() < deadline {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        check()
    }

    async fn client(addr: SocketAddr) -> TcpStream {
        TcpStream::connect(addr).await.unwrap()
    }

    // =============================================================================
    // INTEGRATION TESTS: GOSSIP AND MINING
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_nodes_mine_and_converge_on_one_tip() {
        let node_a = manual_node("node-a", 2, 1).await;
        let node_b = manual_node("node-b", 2, 1).await;
        assert_eq!(node_a.connect_peers(node_b.local_ports()).await, 1);
        assert_eq!(node_b.connect_peers(node_a.local_ports()).await, 1);

        let stream = client(node_a.local_addrs()[0]).await;
        for tx in [make_tx(1, 2, 5, 1), make_tx(3, 4, 7, 2)] {
            send_now(&stream, &Message::SendTransaction(tx).encode())
                .await
                .unwrap();
        }

        let a = node_a.context().clone();
        let b = node_b.context().clone();
        let converged = eventually(|| {
            let tip_a = a.service().tip();
            tip_a.is_some() && tip_a == b.service().tip()
        })
        .await;
        assert!(converged, "tips {:?} / {:?}", a.service().tip(), b.service().tip());
        assert_eq!(a.service().tip().map(|(h, _)| h), Some(Tag::zero()));

        for service in [a.service(), b.service()] {
            assert_eq!(service.balance(&demo_address(1)), Some(Tag::from_u64(99_995)));
            assert_eq!(service.balance(&demo_address(4)), Some(Tag::from_u64(100_007)));
        }

        node_a.shutdown().await.unwrap();
        node_b.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stale_block_rebroadcasts_settled_transaction() {
        let node = manual_node("node-a", 2, 0).await;
        let chain = build_chain(6, 2, 0);
        load_chain(node.context().service(), &chain);

        let peer_listener = bind_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let peer_port = peer_listener.local_addr().unwrap().port();
        assert_eq!(node.connect_peers(&[peer_port]).await, 1);
        let (peer, _) = tokio::time::timeout(WAIT, peer_listener.accept())
            .await
            .unwrap()
            .unwrap();

        let settled = chain[3].transactions[0].clone();
        let stale = seal_block(
            chain[2].hash(),
            Tag::from_u64(3),
            sha256(b"stale-miner"),
            vec![settled.clone(), make_tx(70, 71, 1, 9_001)],
            0,
        );
        let sender = client(node.local_addrs()[0]).await;
        send_now(&sender, &encode_send_block(&stale)).await.unwrap();

        let expected = Message::SendTransaction(settled).encode();
        let relayed = read_exact(&peer, expected.len(), WAIT).await.unwrap();
        assert_eq!(relayed, expected);
        assert_eq!(node.context().service().chain_len(), 6);
        assert_eq!(
            node.context().service().tip().map(|(_, h)| h),
            Some(chain[5].hash())
        );

        node.shutdown().await.unwrap();
    }

    // =============================================================================
    // INTEGRATION TESTS: RENDEZVOUS DISCOVERY
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_workers_find_each_other_through_rendezvous() {
        let rendezvous = Rendezvous::bind("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let bootstrap_addr = rendezvous.local_addr().unwrap();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let service = tokio::spawn(rendezvous.run(shutdown_rx));

        let mut config_a = config("node-a", 2, 1);
        config_a.network.bootstrap_addr = bootstrap_addr;
        let node_a = WorkerNode::start(config_a, &[0], Discovery::Rendezvous)
            .await
            .unwrap();

        // Let the first announcement land before the second worker joins.
        let a = node_a.context().clone();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut config_b = config("node-b", 2, 1);
        config_b.network.bootstrap_addr = bootstrap_addr;
        let node_b = WorkerNode::start(config_b, &[0], Discovery::Rendezvous)
            .await
            .unwrap();
        let b = node_b.context().clone();

        let port_a = node_a.local_ports()[0];
        let port_b = node_b.local_ports()[0];
        let linked = eventually(|| {
            a.peers().has_outbound(port_b) && b.peers().has_outbound(port_a)
        })
        .await;
        assert!(linked, "workers did not dial each other");

        node_a.shutdown().await.unwrap();
        node_b.shutdown().await.unwrap();
        shutdown.send(true).unwrap();
        service.await.unwrap().unwrap();
    }
}
