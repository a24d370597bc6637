//! # Error Types
//!
//! Codec failures. Every variant means the bytes on a connection can no
//! longer be trusted to be framed correctly.

use thiserror::Error;

/// Errors raised while decoding fixed-width wire structures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Fewer bytes than the structure requires.
    #[error("Short buffer: expected {expected} bytes, got {actual}")]
    ShortBuffer { expected: usize, actual: usize },

    /// A digit field contained a byte outside `'0'..='9'`.
    #[error("Invalid digit 0x{byte:02x} at position {position}")]
    InvalidDigit { position: usize, byte: u8 },

    /// Leading byte is not a known opcode.
    #[error("Unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    /// A decimal string does not fit the fixed field width.
    #[error("Value {value} does not fit in {width} digits")]
    FieldOverflow { value: String, width: usize },

    /// A six-digit port field is not a valid TCP port.
    #[error("Invalid port field: {0}")]
    InvalidPort(String),

    /// Block carries the wrong number of transactions.
    #[error("Block carries {actual} transactions, expected {expected}")]
    TransactionCount { expected: usize, actual: usize },
}
