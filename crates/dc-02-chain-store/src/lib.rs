//! # Chain Store Subsystem
//!
//! **Subsystem ID:** 2
//!
//! ## Purpose
//!
//! Holds the node's current best-known history as a stack of blocks plus a
//! height index for O(1) `GET_BLOCK` / `GET_HASH` service. Nothing is
//! persisted.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Top of stack equals index entry at tip height | `ChainStore::push` / `pop` |
//! | Height grows by exactly one per push | `ChainStore::push` |
//! | Each block's prior-hash is the previous block's hash | `ChainStore::push` |
//!
//! The store does no proof-of-work or transaction checks; callers validate
//! blocks before pushing them. The chain is mutated only by the
//! reconciliation service, under its chain lock.

pub mod domain;
pub mod ports;

pub use domain::*;
pub use ports::*;
