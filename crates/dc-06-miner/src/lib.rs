//! # Miner Subsystem
//!
//! **Subsystem ID:** 6
//!
//! ## Purpose
//!
//! Turns a mempool batch into a block by searching nonces until the block
//! hash ends in the configured number of zero hex digits.
//!
//! ## Execution Model
//!
//! ```text
//!  event loop                         dc-miner-<batch> thread
//!  ──────────                         ───────────────────────
//!  spawn_miner(batch, template) ────→ search_nonce (nonce 0, 1, 2, ...)
//!        │                                 │ cancel flag checked per attempt
//!        │  MinerHandle::cancel() ───────→ │ exit, send nothing
//!        │                                 ↓ found
//!  mpsc::UnboundedReceiver ←──────── MinerEvent::Mined { batch_id, block }
//! ```
//!
//! The thread owns its template (and therefore its copy of the batch). It
//! never touches the chain or mempool; applying the result, or returning
//! the batch after cancellation, is the reconciliation service's job.

pub mod domain;
pub mod service;

pub use domain::*;
pub use service::*;
