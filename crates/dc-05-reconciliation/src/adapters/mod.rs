//! Adapters connecting the reconciliation engine to neighbouring subsystems.

pub mod accounts;

pub use accounts::*;
