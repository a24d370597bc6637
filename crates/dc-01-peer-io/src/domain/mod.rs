//! # Domain Layer - Peer I/O
//!
//! - `buffers`: per-socket inbound/outbound byte queues
//! - `readiness`: shared interest bookkeeping
//! - `errors`: PeerIoError

pub mod buffers;
pub mod errors;
pub mod readiness;

pub use buffers::*;
pub use errors::*;
pub use readiness::*;
