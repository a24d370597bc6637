//! # Core Domain Entities
//!
//! - **Digests**: [`Hash32`], [`Address`]
//! - **Chain**: [`Transaction`], [`BlockHeader`], [`Block`]
//! - **Identity**: [`TxFingerprint`]

use std::fmt;
use std::sync::Arc;

use crate::errors::CodecError;
use crate::hashing::compute_block_hash;
use crate::tag::{Tag, TAG_LEN};

/// Encoded size of one transaction record.
pub const TRANSACTION_LEN: usize = 4 * TAG_LEN;

/// Encoded size of a block header.
pub const HEADER_LEN: usize = 5 * TAG_LEN;

/// A raw 32-byte digest (block hashes, addresses, timestamps, identities).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash32(pub [u8; 32]);

/// Account address: SHA-256 of an identity seed.
pub type Address = Hash32;

impl Hash32 {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
        let raw: [u8; 32] = bytes
            .get(..TAG_LEN)
            .and_then(|s| s.try_into().ok())
            .ok_or(CodecError::ShortBuffer {
                expected: TAG_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(raw))
    }

    /// Upper-case hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({}..)", &self.to_hex()[..12])
    }
}

/// Content identity of a transaction: hex of all four fields, concatenated.
///
/// No signature is involved; two transactions with the same fields are the
/// same transaction.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxFingerprint(String);

impl TxFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TxFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxFingerprint({}..)", &self.0[..16.min(self.0.len())])
    }
}

/// An unauthenticated value transfer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Transaction {
    pub sender: Address,
    pub receiver: Address,
    pub amount: Tag,
    pub timestamp: Hash32,
}

impl Transaction {
    pub fn fingerprint(&self) -> TxFingerprint {
        let mut text = String::with_capacity(TRANSACTION_LEN * 2);
        text.push_str(&self.sender.to_hex());
        text.push_str(&self.receiver.to_hex());
        text.push_str(&hex::encode_upper(self.amount.as_bytes()));
        text.push_str(&self.timestamp.to_hex());
        TxFingerprint(text)
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.sender.as_bytes());
        out.extend_from_slice(self.receiver.as_bytes());
        out.extend_from_slice(self.amount.as_bytes());
        out.extend_from_slice(self.timestamp.as_bytes());
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(TRANSACTION_LEN);
        self.encode_into(&mut out);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < TRANSACTION_LEN {
            return Err(CodecError::ShortBuffer {
                expected: TRANSACTION_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            sender: Hash32::from_slice(&bytes[0..32])?,
            receiver: Hash32::from_slice(&bytes[32..64])?,
            amount: Tag::from_digits(&bytes[64..96])?,
            timestamp: Hash32::from_slice(&bytes[96..128])?,
        })
    }
}

/// Fixed-size block header. Field order matches the wire layout.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BlockHeader {
    pub nonce: Tag,
    pub prior_hash: Hash32,
    pub hash: Hash32,
    pub height: Tag,
    pub miner: Address,
}

impl BlockHeader {
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.nonce.as_bytes());
        out.extend_from_slice(self.prior_hash.as_bytes());
        out.extend_from_slice(self.hash.as_bytes());
        out.extend_from_slice(self.height.as_bytes());
        out.extend_from_slice(self.miner.as_bytes());
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::ShortBuffer {
                expected: HEADER_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            nonce: Tag::from_digits(&bytes[0..32])?,
            prior_hash: Hash32::from_slice(&bytes[32..64])?,
            hash: Hash32::from_slice(&bytes[64..96])?,
            height: Tag::from_digits(&bytes[96..128])?,
            miner: Hash32::from_slice(&bytes[128..160])?,
        })
    }
}

/// Header plus exactly N transactions.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

/// Blocks are shared between the chain, the index, and pending sessions.
pub type SharedBlock = Arc<Block>;

impl Block {
    pub fn height(&self) -> Tag {
        self.header.height
    }

    pub fn hash(&self) -> Hash32 {
        self.header.hash
    }

    pub fn prior_hash(&self) -> Hash32 {
        self.header.prior_hash
    }

    /// Hash over the header fields and transactions, ignoring the stored hash.
    pub fn recompute_hash(&self) -> Hash32 {
        compute_block_hash(
            &self.header.nonce,
            &self.header.prior_hash,
            &self.header.height,
            &self.header.miner,
            &self.transactions,
        )
    }

    /// Header and transactions without the opcode byte.
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::payload_len(self.transactions.len()));
        self.header.encode_into(&mut out);
        for tx in &self.transactions {
            tx.encode_into(&mut out);
        }
        out
    }

    pub fn payload_len(txs_per_block: usize) -> usize {
        HEADER_LEN + txs_per_block * TRANSACTION_LEN
    }

    pub fn decode_payload(bytes: &[u8], txs_per_block: usize) -> Result<Self, CodecError> {
        let expected = Self::payload_len(txs_per_block);
        if bytes.len() < expected {
            return Err(CodecError::ShortBuffer {
                expected,
                actual: bytes.len(),
            });
        }
        let header = BlockHeader::decode(&bytes[..HEADER_LEN])?;
        let transactions = bytes[HEADER_LEN..expected]
            .chunks_exact(TRANSACTION_LEN)
            .map(Transaction::decode)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            header,
            transactions,
        })
    }
}
