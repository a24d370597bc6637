//! Ports layer for the Peer I/O subsystem.

pub mod outbound;

pub use outbound::*;
