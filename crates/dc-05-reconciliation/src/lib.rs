//! # Reconciliation Subsystem
//!
//! **Subsystem ID:** 5
//!
//! ## Purpose
//!
//! Decides what to do with every block that reaches the node, from a peer
//! or from the local miner, and keeps the chain, ledger and mempool
//! consistent while doing it. This is the only subsystem that mutates the
//! chain.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Only validated blocks are pushed | `service.rs` - `validate_block()` before classify |
//! | Equal-height forks resolve identically on every node | `domain/classify.rs` - smaller hash wins |
//! | A failed search leaves the chain untouched | `domain/search.rs` - deferred commit |
//! | Commit refuses a moved tip | `service.rs` - `commit_locked()` |
//! | Ledger and mempool follow every chain change | `domain/settlement.rs` |
//! | A new tip preempts the in-flight mining batch | `service.rs` - `settle()` |
//!
//! ## Block Flow
//!
//! ```text
//!  peer block ──validate──→ classify ─┬─ Genesis / Extend ──→ push ──┐
//!                                     ├─ Replace ──→ pop + push ─────┤
//!                                     ├─ DeepMerge ──→ AncestorSearch│
//!                                     │      GET_HASH / GET_BLOCK    │
//!                                     │      rounds with the peer    │
//!                                     │            ↓ Complete        │
//!                                     │      commit_search ──────────┤
//!                                     ├─ PropagateOnly ──→ relay txs │
//!                                     └─ Duplicate / KeepLocal       ↓
//!                                                             settle: ledger
//!  mined block ──apply_mined_block──→ push (or discard) ────→ + mempool
//! ```
//!
//! ## Locking
//!
//! `ReconciliationService` holds the chain behind a `parking_lot::RwLock`
//! and the ledger plus mempool behind one `parking_lot::Mutex`. The chain
//! lock is always taken first. Neither guard is held across an `.await`;
//! the async search driver re-acquires locks for each reply.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service.rs          - ReconciliationService (owns all state)   │
//! │  adapters/accounts   - Ledger as mempool AccountReader          │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/outbound.rs   - AncestorSource (blocking search peer)    │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/classify.rs   - Disposition of an incoming block        │
//! │  domain/validation.rs - count, hash, work, genesis checks       │
//! │  domain/search.rs     - AncestorSearch state machine            │
//! │  domain/settlement.rs - reconcile_transactions                  │
//! │  domain/entities.rs   - ChainParams, Acceptance, MiningJob      │
//! │  domain/errors.rs     - ReconcileError                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
pub use service::ReconciliationService;
