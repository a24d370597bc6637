//! Builders for transactions and correctly-hashed blocks.
//!
//! Enable with the `test-utils` feature flag.

use crate::entities::{Address, Block, BlockHeader, Hash32, Transaction};
use crate::hashing::{compute_block_hash, genesis_prior_hash, meets_difficulty, sha256};
use crate::tag::Tag;

/// Address of demo account `i` (SHA-256 of its decimal index).
pub fn demo_address(i: u64) -> Address {
    sha256(i.to_string().as_bytes())
}

/// Transfer between demo accounts, made unique by `salt`.
pub fn make_tx(from: u64, to: u64, amount: u64, salt: u64) -> Transaction {
    let mut stamp = [0u8; 32];
    stamp[24..].copy_from_slice(&salt.to_be_bytes());
    Transaction {
        sender: demo_address(from),
        receiver: demo_address(to),
        amount: Tag::from_u64(amount),
        timestamp: Hash32(stamp),
    }
}

/// Search nonces from zero until the hash meets `difficulty`.
pub fn seal_block(
    prior_hash: Hash32,
    height: Tag,
    miner: Address,
    transactions: Vec<Transaction>,
    difficulty: usize,
) -> Block {
    let mut nonce = Tag::zero();
    loop {
        let hash = compute_block_hash(&nonce, &prior_hash, &height, &miner, &transactions);
        if meets_difficulty(&hash, difficulty) {
            return Block {
                header: BlockHeader {
                    nonce,
                    prior_hash,
                    hash,
                    height,
                    miner,
                },
                transactions,
            };
        }
        nonce = nonce.increment();
    }
}

/// A linked chain of `len` blocks starting at height zero.
///
/// `fork` changes the miner address so two calls with different values
/// produce disjoint histories. Each block carries `txs_per_block` transfers
/// of 1 between demo accounts.
pub fn build_chain(len: u64, txs_per_block: usize, fork: u64) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    for height in 0..len {
        blocks.push(next_block(blocks.last(), txs_per_block, fork, height));
    }
    blocks
}

/// Extend `base` with `extra` blocks mined under `fork`.
pub fn extend_chain(base: &[Block], extra: u64, txs_per_block: usize, fork: u64) -> Vec<Block> {
    let mut blocks = base.to_vec();
    for _ in 0..extra {
        let height = blocks.len() as u64;
        let block = next_block(blocks.last(), txs_per_block, fork, height);
        blocks.push(block);
    }
    blocks
}

fn next_block(prev: Option<&Block>, txs_per_block: usize, fork: u64, height: u64) -> Block {
    let prior = prev.map(|b| b.hash()).unwrap_or_else(genesis_prior_hash);
    let transactions = (0..txs_per_block as u64)
        .map(|i| make_tx(i % 100, (i + 1) % 100, 1, fork * 1_000_000 + height * 1_000 + i))
        .collect();
    seal_block(
        prior,
        Tag::from_u64(height),
        sha256(format!("miner-{fork}").as_bytes()),
        transactions,
        0,
    )
}
