//! Test doubles for the blocking search driver.
//!
//! Enable with the `test-utils` feature flag.

use async_trait::async_trait;
use dc_03_ledger::Ledger;
use dc_04_mempool::{MempoolConfig, TransactionPool};
use shared_types::{Block, Hash32, Tag};

use crate::domain::{ChainParams, ReconcileError, Result};
use crate::ports::AncestorSource;
use crate::service::ReconciliationService;

/// Answers search requests from another in-process node.
pub struct ServiceSource<'a> {
    peer: &'a ReconciliationService,
    pub requests: Vec<(&'static str, Tag)>,
}

impl<'a> ServiceSource<'a> {
    pub fn new(peer: &'a ReconciliationService) -> Self {
        Self {
            peer,
            requests: Vec::new(),
        }
    }
}

#[async_trait]
impl AncestorSource for ServiceSource<'_> {
    async fn request_hash(&mut self, height: Tag) -> Result<Hash32> {
        self.requests.push(("GET_HASH", height));
        self.peer
            .hash_at(&height)
            .ok_or_else(|| ReconcileError::PeerUnavailable(format!("no hash at {height:?}")))
    }

    async fn request_block(&mut self, height: Tag) -> Result<Block> {
        self.requests.push(("GET_BLOCK", height));
        self.peer
            .block_at(&height)
            .map(|b| (*b).clone())
            .ok_or_else(|| ReconcileError::PeerUnavailable(format!("no block at {height:?}")))
    }
}

/// A peer that never replies.
pub struct UnresponsiveSource;

#[async_trait]
impl AncestorSource for UnresponsiveSource {
    async fn request_hash(&mut self, _height: Tag) -> Result<Hash32> {
        std::future::pending().await
    }

    async fn request_block(&mut self, _height: Tag) -> Result<Block> {
        std::future::pending().await
    }
}

/// Difficulty 0, so `shared_types::test_utils` chains validate.
pub fn test_params(txs_per_block: usize) -> ChainParams {
    ChainParams {
        txs_per_block,
        difficulty: 0,
    }
}

/// A service over 101 demo accounts holding 100000 each.
pub fn test_service(txs_per_block: usize) -> ReconciliationService {
    ReconciliationService::new(
        test_params(txs_per_block),
        Ledger::with_demo_accounts(101, Tag::from_u64(100_000)),
        TransactionPool::new(MempoolConfig {
            transactions_per_block: txs_per_block,
        }),
    )
}

/// Feed `blocks` in order, expecting each to extend the chain.
pub fn load_chain(service: &ReconciliationService, blocks: &[Block]) {
    for block in blocks {
        match service.accept_new_block(block.clone()) {
            Ok(crate::domain::Acceptance::Applied(_)) => {}
            other => panic!("block at {:?} not applied: {other:?}", block.height()),
        }
    }
}
