//! Ports layer for the Reconciliation subsystem.

pub mod outbound;

pub use outbound::*;
