use shared_types::Address;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Account not found: {address:?}")]
    UnknownAccount { address: Address },
}
