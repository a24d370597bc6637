//! Adapters binding the buffers to tokio sockets.

pub mod tcp;

pub use tcp::*;
