//! Ledger-backed [`AccountReader`] for mempool admission.

use dc_03_ledger::Ledger;
use dc_04_mempool::AccountReader;
use shared_types::{Address, Tag};

pub struct LedgerAccounts<'a>(pub &'a Ledger);

impl AccountReader for LedgerAccounts<'_> {
    fn balance_of(&self, address: &Address) -> Option<Tag> {
        self.0.balance(address)
    }
}
