//! # Domain Layer - Reconciliation
//!
//! - `classify`: where an incoming block fits relative to the tip
//! - `validation`: proof-of-work and structure checks
//! - `search`: ancestor-search state machine
//! - `settlement`: ledger and mempool bookkeeping after chain mutation
//! - `errors`: ReconcileError

pub mod classify;
pub mod entities;
pub mod errors;
pub mod search;
pub mod settlement;
pub mod validation;

pub use classify::*;
pub use entities::*;
pub use errors::*;
pub use search::*;
pub use settlement::*;
pub use validation::*;
