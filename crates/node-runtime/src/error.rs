//! Runtime error types.

use dc_01_peer_io::PeerIoError;
use dc_05_reconciliation::ReconcileError;
use dc_06_miner::MinerError;
use shared_types::CodecError;
use thiserror::Error;

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Peer I/O error: {0}")]
    PeerIo(#[from] PeerIoError),

    /// Malformed bytes on a connection; the connection is closed.
    #[error("Protocol violation: {0}")]
    Codec(#[from] CodecError),

    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Miner error: {0}")]
    Miner(#[from] MinerError),

    /// A background task stopped unexpectedly.
    #[error("Task failed: {0}")]
    Task(String),
}

impl RuntimeError {
    /// Whether the connection that produced this error must be dropped.
    pub fn closes_connection(&self) -> bool {
        match self {
            Self::PeerIo(e) => e.is_fatal_for_connection(),
            Self::Codec(_) => true,
            Self::Reconcile(e) => e.is_peer_fault(),
            Self::Config(_) | Self::Miner(_) | Self::Task(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_closing_errors() {
        assert!(RuntimeError::from(PeerIoError::Closed).closes_connection());
        assert!(RuntimeError::from(CodecError::UnknownOpcode(b'x')).closes_connection());
        assert!(RuntimeError::from(ReconcileError::BadGenesisPrior).closes_connection());
        assert!(!RuntimeError::from(ReconcileError::TipMoved).closes_connection());
    }
}
