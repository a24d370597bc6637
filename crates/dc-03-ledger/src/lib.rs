//! # Ledger Subsystem
//!
//! **Subsystem ID:** 3
//!
//! ## Purpose
//!
//! Maps account addresses to decimal-digit balances and applies transactions
//! forward (block application) or in reverse (rollback during
//! reconciliation).
//!
//! ## Failure Policy
//!
//! Unknown accounts are not fatal. A transaction touching one is logged and
//! skipped while the rest of the batch proceeds, which models "foreign or
//! malformed account, drop the effect". Balances saturate at zero and at
//! all-nines instead of failing.
//!
//! ## Demo Accounts
//!
//! Workers start with a deterministic set of pre-funded accounts so that
//! independently started nodes agree on initial state:
//!
//! ```text
//! address(i) = SHA-256(decimal(i))   for i in 0..count
//! balance    = 00000000000000000000000000100000
//! ```

pub mod domain;

pub use domain::*;
