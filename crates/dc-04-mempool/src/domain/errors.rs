//! Mempool error types.
//!
//! Admission failures are never reported back to the submitting peer; the
//! caller logs them and drops the transaction.

use shared_types::{Address, Tag, TxFingerprint};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MempoolError {
    /// Already active, in flight, or settled.
    DuplicateTransaction(TxFingerprint),

    UnknownSender(Address),

    UnknownReceiver(Address),

    /// Sender balance is smaller than the amount.
    InsufficientFunds { required: Tag, available: Tag },

    /// A batch is already being mined.
    BatchInFlight { id: u64 },

    /// Not enough active transactions to fill a block.
    NotEnoughTransactions { available: usize, required: usize },
}

impl std::fmt::Display for MempoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateTransaction(fp) => write!(f, "Duplicate transaction: {:?}", fp),
            Self::UnknownSender(addr) => write!(f, "Unknown sender {:?}", addr),
            Self::UnknownReceiver(addr) => write!(f, "Unknown receiver {:?}", addr),
            Self::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {:?}, available {:?}",
                    required, available
                )
            }
            Self::BatchInFlight { id } => write!(f, "Batch {} already in flight", id),
            Self::NotEnoughTransactions {
                available,
                required,
            } => {
                write!(
                    f,
                    "Not enough transactions: {} active, {} required",
                    available, required
                )
            }
        }
    }
}

impl std::error::Error for MempoolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MempoolError::InsufficientFunds {
            required: Tag::from_u64(500),
            available: Tag::from_u64(20),
        };
        let msg = err.to_string();
        assert!(msg.contains("Tag(500)"));
        assert!(msg.contains("Tag(20)"));
    }
}
