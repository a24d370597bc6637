//! # Domain Layer - Miner
//!
//! - `template`: block skeleton with the hash input pre-serialised
//! - `pow`: nonce search with cooperative cancellation
//! - `entities`: MinedBlock
//! - `errors`: MinerError

pub mod entities;
pub mod errors;
pub mod pow;
pub mod template;

pub use entities::*;
pub use errors::*;
pub use pow::*;
pub use template::*;
