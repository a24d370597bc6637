//! # Domain Layer - Chain Store

pub mod chain;
pub mod errors;

pub use chain::*;
pub use errors::*;
