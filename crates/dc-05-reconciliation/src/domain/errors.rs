//! Error types for the reconciliation subsystem

use dc_02_chain_store::ChainError;
use shared_types::Tag;
use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, ReconcileError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("Block at {height:?} carries {actual} transactions, expected {expected}")]
    WrongTransactionCount {
        height: Tag,
        expected: usize,
        actual: usize,
    },

    #[error("Block at {height:?} hash does not match its contents")]
    HashMismatch { height: Tag },

    #[error("Block at {height:?} misses difficulty {difficulty}")]
    InsufficientWork { height: Tag, difficulty: usize },

    #[error("Height-zero block does not reference the genesis prior-hash")]
    BadGenesisPrior,

    #[error("Expected block at {expected:?}, got {actual:?}")]
    UnexpectedHeight { expected: Tag, actual: Tag },

    #[error("Block at {height:?} does not link to its predecessor")]
    BrokenLinkage { height: Tag },

    #[error("Reply does not match search state {state}")]
    UnexpectedReply { state: &'static str },

    #[error("Local tip changed during ancestor search")]
    TipMoved,

    #[error("No reply for {request} at {height:?}")]
    Timeout { request: &'static str, height: Tag },

    #[error("Peer unavailable: {0}")]
    PeerUnavailable(String),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),
}

impl ReconcileError {
    /// The peer sent something invalid (as opposed to a local race).
    pub fn is_peer_fault(&self) -> bool {
        matches!(
            self,
            Self::WrongTransactionCount { .. }
                | Self::HashMismatch { .. }
                | Self::InsufficientWork { .. }
                | Self::BadGenesisPrior
                | Self::UnexpectedHeight { .. }
                | Self::BrokenLinkage { .. }
                | Self::UnexpectedReply { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_fault_classification() {
        assert!(ReconcileError::BadGenesisPrior.is_peer_fault());
        assert!(!ReconcileError::TipMoved.is_peer_fault());
        assert!(!ReconcileError::Timeout {
            request: "GET_HASH",
            height: Tag::zero()
        }
        .is_peer_fault());
    }
}
