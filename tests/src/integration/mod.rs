//! Cross-subsystem integration tests.

pub mod mining_flow;
pub mod network;
pub mod reconciliation;
