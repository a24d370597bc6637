//! # Domain Layer - Mempool Subsystem
//!
//! - `entities`: MiningBatch, MempoolConfig, Admission
//! - `pool`: TransactionPool
//! - `errors`: MempoolError

pub mod entities;
pub mod errors;
pub mod pool;

pub use entities::*;
pub use errors::*;
pub use pool::*;
