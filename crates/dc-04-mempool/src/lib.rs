//! # Transaction Pool (Mempool) Subsystem
//!
//! **Subsystem ID:** 4
//!
//! ## Purpose
//!
//! Content-addressed pool of transactions awaiting inclusion, the batch the
//! miner is currently working on, and a record of transactions
//! settled by a block still on the chain.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | A fingerprint lives in at most one of active / in-flight / settled | every transition in `domain/pool.rs` |
//! | No duplicate admission | `TransactionPool::admit()` via `exists()` |
//! | Cancelled mining never loses transactions | `TransactionPool::return_in_flight()` |
//!
//! ## Lifecycle
//!
//! ```text
//!            admit                 take_batch
//! (peer) ──────────→ [ACTIVE] ───────────────→ [IN-FLIGHT]
//!                      ↑  │                        │   │
//!                      │  │  promote_to_settled    │   │ return_in_flight
//!       demote_to_     │  └──────────┐   ┌─────────┘   │ (miner cancelled)
//!       active         │             ↓   ↓             │
//!       (rollback)     └──────── [SETTLED] ←───────────┘
//!                                    │      ↑ (back to ACTIVE)
//!                                    └─ evicted oldest-first past capacity
//! ```
//!
//! ## Outbound Dependencies
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | `AccountReader` | sender/receiver existence and balance checks |

pub mod domain;
pub mod ports;

pub use domain::*;
pub use ports::*;
