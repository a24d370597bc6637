//! Account balance map.

use std::collections::HashMap;

use shared_types::{Address, Tag, Transaction};
use tracing::{debug, warn};

use super::accounts::demo_accounts;
use super::errors::LedgerError;

/// Whether a transaction is being applied or undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    /// Swap sender and receiver roles to undo a prior forward execution.
    Reverse,
}

#[derive(Debug, Default, Clone)]
pub struct Ledger {
    balances: HashMap<Address, Tag>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_demo_accounts(count: u64, balance: Tag) -> Self {
        let mut ledger = Self::new();
        for (address, balance) in demo_accounts(count, balance) {
            ledger.open_account(address, balance);
        }
        ledger
    }

    pub fn open_account(&mut self, address: Address, balance: Tag) {
        self.balances.insert(address, balance);
    }

    pub fn balance(&self, address: &Address) -> Option<Tag> {
        self.balances.get(address).copied()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.balances.contains_key(address)
    }

    /// Add `amount`, saturating at all-nines. Returns the new balance.
    pub fn credit(&mut self, address: &Address, amount: &Tag) -> Result<Tag, LedgerError> {
        let balance = self
            .balances
            .get_mut(address)
            .ok_or(LedgerError::UnknownAccount { address: *address })?;
        *balance = balance.saturating_add(amount);
        Ok(*balance)
    }

    /// Subtract `amount`, saturating at zero. Returns the new balance.
    pub fn debit(&mut self, address: &Address, amount: &Tag) -> Result<Tag, LedgerError> {
        let balance = self
            .balances
            .get_mut(address)
            .ok_or(LedgerError::UnknownAccount { address: *address })?;
        *balance = balance.saturating_sub(amount);
        Ok(*balance)
    }

    /// Move `tx.amount` from payer to payee.
    ///
    /// Both accounts are looked up before either is touched, so an unknown
    /// account leaves the ledger unchanged.
    pub fn execute(&mut self, tx: &Transaction, direction: Direction) -> Result<(), LedgerError> {
        let (payer, payee) = match direction {
            Direction::Forward => (&tx.sender, &tx.receiver),
            Direction::Reverse => (&tx.receiver, &tx.sender),
        };
        for address in [payer, payee] {
            if !self.contains(address) {
                return Err(LedgerError::UnknownAccount { address: *address });
            }
        }
        self.debit(payer, &tx.amount)?;
        self.credit(payee, &tx.amount)?;
        Ok(())
    }

    /// Execute a batch, logging and skipping failures. Returns how many applied.
    pub fn execute_all<'a, I>(&mut self, txs: I, direction: Direction) -> usize
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut applied = 0;
        for tx in txs {
            match self.execute(tx, direction) {
                Ok(()) => applied += 1,
                Err(e) => warn!("[dc-03] skipping {:?} transaction: {}", direction, e),
            }
        }
        debug!("[dc-03] executed {} transactions ({:?})", applied, direction);
        applied
    }
}
