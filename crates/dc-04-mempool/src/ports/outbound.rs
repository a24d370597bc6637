//! Outbound (Driven) ports for the Mempool subsystem.

use shared_types::{Address, Tag};

/// Account lookups needed to admit a transaction.
///
/// Implemented over the ledger by the reconciliation crate.
pub trait AccountReader {
    /// Current balance, or `None` for an unknown account.
    fn balance_of(&self, address: &Address) -> Option<Tag>;
}

/// Mock account reader for testing.
#[cfg(test)]
pub struct MockAccounts {
    balances: std::collections::HashMap<Address, Tag>,
}

#[cfg(test)]
impl MockAccounts {
    pub fn new() -> Self {
        Self {
            balances: std::collections::HashMap::new(),
        }
    }

    pub fn with_balance(mut self, address: Address, balance: u64) -> Self {
        self.balances.insert(address, Tag::from_u64(balance));
        self
    }

    /// Demo accounts `0..count`, each holding `balance`.
    pub fn demo(count: u64, balance: u64) -> Self {
        (0..count).fold(Self::new(), |m, i| {
            m.with_balance(shared_types::test_utils::demo_address(i), balance)
        })
    }
}

#[cfg(test)]
impl AccountReader for MockAccounts {
    fn balance_of(&self, address: &Address) -> Option<Tag> {
        self.balances.get(address).copied()
    }
}
