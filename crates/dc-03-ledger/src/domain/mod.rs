//! # Domain Layer - Ledger

pub mod accounts;
pub mod errors;
pub mod ledger;

pub use accounts::*;
pub use errors::*;
pub use ledger::*;
