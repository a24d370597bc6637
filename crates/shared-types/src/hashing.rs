//! # Hashing Helpers
//!
//! SHA-256 wrappers, block hash computation, and the difficulty predicate.

use sha2::{Digest, Sha256};

use crate::entities::{Address, Hash32, Transaction};
use crate::tag::{Tag, TAG_LEN};

pub fn sha256(data: &[u8]) -> Hash32 {
    Hash32(Sha256::digest(data).into())
}

/// Prior-hash used by height-zero blocks: SHA-256 of 32 ASCII zeros.
pub fn genesis_prior_hash() -> Hash32 {
    sha256(&[b'0'; TAG_LEN])
}

/// Node identity (and miner address) derived from a seed string.
pub fn identity_from_seed(seed: &str) -> Hash32 {
    sha256(seed.as_bytes())
}

/// `SHA-256(nonce ‖ prior ‖ height ‖ miner ‖ transactions)`.
pub fn compute_block_hash(
    nonce: &Tag,
    prior_hash: &Hash32,
    height: &Tag,
    miner: &Address,
    transactions: &[Transaction],
) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(nonce.as_bytes());
    hasher.update(prior_hash.as_bytes());
    hasher.update(height.as_bytes());
    hasher.update(miner.as_bytes());
    for tx in transactions {
        hasher.update(tx.sender.as_bytes());
        hasher.update(tx.receiver.as_bytes());
        hasher.update(tx.amount.as_bytes());
        hasher.update(tx.timestamp.as_bytes());
    }
    Hash32(hasher.finalize().into())
}

/// True when the hash's hex rendering ends in at least `difficulty` zeros.
pub fn meets_difficulty(hash: &Hash32, difficulty: usize) -> bool {
    trailing_zero_digits(hash) >= difficulty
}

/// Count of trailing `'0'` characters in the hex rendering.
pub fn trailing_zero_digits(hash: &Hash32) -> usize {
    let mut count = 0;
    for byte in hash.0.iter().rev() {
        if byte & 0x0f != 0 {
            break;
        }
        count += 1;
        if byte & 0xf0 != 0 {
            break;
        }
        count += 1;
    }
    count
}
