//! # Transaction Pool
//!
//! ## Data Structures
//!
//! - `active`: pending transactions ordered by fingerprint, so every node
//!   assembles the same batch from the same pool
//! - `in_flight`: the batch currently handed to the miner
//! - `settled`: fingerprints applied by a block still on the chain. Kept
//!   until that block is rolled back, so a settled transaction can never be
//!   admitted again

use std::collections::{BTreeMap, HashSet};

use shared_types::{Transaction, TxFingerprint};
use tracing::{debug, trace};

use super::entities::{Admission, MempoolConfig, MiningBatch};
use super::errors::MempoolError;
use crate::ports::AccountReader;

#[derive(Debug)]
struct InFlight {
    id: u64,
    transactions: Vec<Transaction>,
    fingerprints: HashSet<TxFingerprint>,
}

#[derive(Debug)]
pub struct TransactionPool {
    config: MempoolConfig,
    active: BTreeMap<TxFingerprint, Transaction>,
    in_flight: Option<InFlight>,
    settled: HashSet<TxFingerprint>,
    next_batch_id: u64,
}

impl TransactionPool {
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            config,
            active: BTreeMap::new(),
            in_flight: None,
            settled: HashSet::new(),
            next_batch_id: 1,
        }
    }

    pub fn config(&self) -> &MempoolConfig {
        &self.config
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.as_ref().map_or(0, |b| b.transactions.len())
    }

    pub fn settled_len(&self) -> usize {
        self.settled.len()
    }

    pub fn in_flight_id(&self) -> Option<u64> {
        self.in_flight.as_ref().map(|b| b.id)
    }

    pub fn is_active(&self, fp: &TxFingerprint) -> bool {
        self.active.contains_key(fp)
    }

    pub fn is_settled(&self, fp: &TxFingerprint) -> bool {
        self.settled.contains(fp)
    }

    fn is_in_flight(&self, fp: &TxFingerprint) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|b| b.fingerprints.contains(fp))
    }

    /// Known in any of the three sets.
    pub fn exists(&self, fp: &TxFingerprint) -> bool {
        self.is_active(fp) || self.is_in_flight(fp) || self.is_settled(fp)
    }

    /// True when a batch can be taken right now.
    pub fn ready_to_mine(&self) -> bool {
        self.in_flight.is_none() && self.active.len() >= self.config.transactions_per_block
    }

    /// Validate and insert into `active`.
    ///
    /// The caller broadcasts the transaction on success and starts mining
    /// when `ready_to_mine` is set.
    pub fn admit<A: AccountReader + ?Sized>(
        &mut self,
        tx: Transaction,
        accounts: &A,
    ) -> Result<Admission, MempoolError> {
        let fp = tx.fingerprint();
        if self.exists(&fp) {
            return Err(MempoolError::DuplicateTransaction(fp));
        }
        let available = accounts
            .balance_of(&tx.sender)
            .ok_or(MempoolError::UnknownSender(tx.sender))?;
        if accounts.balance_of(&tx.receiver).is_none() {
            return Err(MempoolError::UnknownReceiver(tx.receiver));
        }
        if available < tx.amount {
            return Err(MempoolError::InsufficientFunds {
                required: tx.amount,
                available,
            });
        }
        self.active.insert(fp, tx);
        trace!("[dc-04] admitted, active={}", self.active.len());
        Ok(Admission {
            ready_to_mine: self.ready_to_mine(),
        })
    }

    /// Record a block's transactions as settled, pulling them out of
    /// `active` or the in-flight batch, or synthesising an entry if this node
    /// never saw them.
    pub fn promote_to_settled(&mut self, txs: &[Transaction]) {
        for tx in txs {
            let fp = tx.fingerprint();
            self.active.remove(&fp);
            if let Some(batch) = self.in_flight.as_mut() {
                if batch.fingerprints.remove(&fp) {
                    batch.transactions.retain(|t| t != tx);
                }
            }
            self.settled.insert(fp);
        }
        if self
            .in_flight
            .as_ref()
            .is_some_and(|b| b.transactions.is_empty())
        {
            self.in_flight = None;
        }
    }

    /// Return a rolled-back block's transactions to `active`.
    pub fn demote_to_active(&mut self, txs: &[Transaction]) {
        for tx in txs {
            let fp = tx.fingerprint();
            self.settled.remove(&fp);
            if !self.is_in_flight(&fp) {
                self.active.entry(fp).or_insert(*tx);
            }
        }
    }

    /// Move the first `count` active transactions into a new in-flight batch.
    pub fn take_batch(&mut self, count: usize) -> Result<MiningBatch, MempoolError> {
        if let Some(batch) = &self.in_flight {
            return Err(MempoolError::BatchInFlight { id: batch.id });
        }
        if self.active.len() < count {
            return Err(MempoolError::NotEnoughTransactions {
                available: self.active.len(),
                required: count,
            });
        }
        let keys: Vec<TxFingerprint> = self.active.keys().take(count).cloned().collect();
        let mut transactions = Vec::with_capacity(count);
        for fp in &keys {
            if let Some(tx) = self.active.remove(fp) {
                transactions.push(tx);
            }
        }
        let id = self.next_batch_id;
        self.next_batch_id += 1;
        self.in_flight = Some(InFlight {
            id,
            transactions: transactions.clone(),
            fingerprints: keys.into_iter().collect(),
        });
        debug!("[dc-04] batch {} taken ({} txs)", id, transactions.len());
        Ok(MiningBatch { id, transactions })
    }

    /// Give the in-flight batch back to `active`. Returns how many moved.
    pub fn return_in_flight(&mut self) -> usize {
        let Some(batch) = self.in_flight.take() else {
            return 0;
        };
        let mut returned = 0;
        for tx in batch.transactions {
            let fp = tx.fingerprint();
            if !self.is_settled(&fp) {
                self.active.entry(fp).or_insert(tx);
                returned += 1;
            }
        }
        debug!("[dc-04] batch {} returned ({} txs)", batch.id, returned);
        returned
    }

    /// The subset of `txs` already settled here, in input order.
    pub fn settled_among(&self, txs: &[Transaction]) -> Vec<Transaction> {
        txs.iter()
            .filter(|tx| self.is_settled(&tx.fingerprint()))
            .copied()
            .collect()
    }
}
