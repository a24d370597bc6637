//! # Domain Errors
//!
//! Structural push failures. Each one means the caller tried to link a block
//! that does not continue the current tip.

use shared_types::{Hash32, Tag};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Height is not tip + 1 (or zero on an empty chain).
    HeightGap { expected: Tag, actual: Tag },

    /// Prior-hash does not name the current tip.
    PriorMismatch {
        height: Tag,
        expected: Hash32,
        actual: Hash32,
    },
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeightGap { expected, actual } => {
                write!(f, "Height gap: expected {:?}, got {:?}", expected, actual)
            }
            Self::PriorMismatch {
                height,
                expected,
                actual,
            } => write!(
                f,
                "Prior mismatch at {:?}: expected {:?}, got {:?}",
                height, expected, actual
            ),
        }
    }
}

impl std::error::Error for ChainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChainError::HeightGap {
            expected: Tag::from_u64(4),
            actual: Tag::from_u64(6),
        };
        let msg = err.to_string();
        assert!(msg.contains("Tag(4)"));
        assert!(msg.contains("Tag(6)"));
    }
}
