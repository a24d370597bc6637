//! Ports layer for the Chain Store subsystem.

pub mod inbound;

pub use inbound::*;
