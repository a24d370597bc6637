//! Deterministic demo accounts shared by every worker.

use shared_types::{sha256, Address, Tag};

/// Accounts created at worker startup.
pub const DEFAULT_DEMO_ACCOUNTS: u64 = 101;

/// Starting balance of each demo account.
pub const DEFAULT_DEMO_BALANCE: u64 = 100_000;

/// Address of demo account `index`.
pub fn demo_account_address(index: u64) -> Address {
    sha256(index.to_string().as_bytes())
}

/// `(address, balance)` pairs for the first `count` demo accounts.
pub fn demo_accounts(count: u64, balance: Tag) -> impl Iterator<Item = (Address, Tag)> {
    (0..count).map(move |i| (demo_account_address(i), balance))
}
