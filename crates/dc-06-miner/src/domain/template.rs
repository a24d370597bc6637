//! Candidate block awaiting a nonce.

use sha2::{Digest, Sha256};
use shared_types::{
    genesis_prior_hash, Address, Block, BlockHeader, Hash32, Tag, Transaction, TRANSACTION_LEN,
};

/// Everything in a block except the nonce and hash.
///
/// The hash input after the nonce never changes between attempts, so it is
/// serialised once here.
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    prior_hash: Hash32,
    height: Tag,
    miner: Address,
    transactions: Vec<Transaction>,
    tail: Vec<u8>,
}

impl BlockTemplate {
    pub fn new(prior_hash: Hash32, height: Tag, miner: Address, transactions: Vec<Transaction>) -> Self {
        let mut tail = Vec::with_capacity(96 + transactions.len() * TRANSACTION_LEN);
        tail.extend_from_slice(prior_hash.as_bytes());
        tail.extend_from_slice(height.as_bytes());
        tail.extend_from_slice(miner.as_bytes());
        for tx in &transactions {
            tx.encode_into(&mut tail);
        }
        Self {
            prior_hash,
            height,
            miner,
            transactions,
            tail,
        }
    }

    pub fn height(&self) -> Tag {
        self.height
    }

    pub fn prior_hash(&self) -> Hash32 {
        self.prior_hash
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Block hash for `nonce`.
    pub fn hash_with(&self, nonce: &Tag) -> Hash32 {
        let mut hasher = Sha256::new();
        hasher.update(nonce.as_bytes());
        hasher.update(&self.tail);
        Hash32(hasher.finalize().into())
    }

    pub fn seal(self, nonce: Tag, hash: Hash32) -> Block {
        Block {
            header: BlockHeader {
                nonce,
                prior_hash: self.prior_hash,
                hash,
                height: self.height,
                miner: self.miner,
            },
            transactions: self.transactions,
        }
    }
}
