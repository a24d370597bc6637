//! # Digit Tags
//!
//! A [`Tag`] is 32 ASCII decimal digits, most significant first. Heights,
//! nonces and amounts all travel in this form.
//!
//! Arithmetic propagates carry/borrow digit by digit. The `checked_*` forms
//! report overflow; the `saturating_*` forms log it and clamp to all-nines or
//! all-zeros, which is the behaviour the ledger and miner rely on.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::errors::CodecError;

/// Width of every digit tag and digest on the wire.
pub const TAG_LEN: usize = 32;

/// Fixed-width decimal-digit counter.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag([u8; TAG_LEN]);

impl Tag {
    /// All zeros.
    pub const fn zero() -> Self {
        Self([b'0'; TAG_LEN])
    }

    /// All nines (the saturation ceiling).
    pub const fn max() -> Self {
        Self([b'9'; TAG_LEN])
    }

    /// Build from raw bytes, rejecting anything that is not a digit.
    pub fn from_digits(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < TAG_LEN {
            return Err(CodecError::ShortBuffer {
                expected: TAG_LEN,
                actual: bytes.len(),
            });
        }
        let mut out = [b'0'; TAG_LEN];
        for (position, &byte) in bytes[..TAG_LEN].iter().enumerate() {
            if !byte.is_ascii_digit() {
                return Err(CodecError::InvalidDigit { position, byte });
            }
            out[position] = byte;
        }
        Ok(Self(out))
    }

    /// Left-pad an integer to 32 digits.
    pub fn from_u64(value: u64) -> Self {
        let text = value.to_string();
        let mut out = [b'0'; TAG_LEN];
        out[TAG_LEN - text.len()..].copy_from_slice(text.as_bytes());
        Self(out)
    }

    /// Low 18 digits as an integer. Used for logging and slot arithmetic.
    pub fn low_u64(&self) -> u64 {
        self.0[TAG_LEN - 18..]
            .iter()
            .fold(0u64, |acc, d| acc * 10 + u64::from(d - b'0'))
    }

    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&d| d == b'0')
    }

    pub fn is_max(&self) -> bool {
        self.0.iter().all(|&d| d == b'9')
    }

    /// Digit-wise sum, `None` on carry out of the top digit.
    pub fn checked_add(&self, other: &Tag) -> Option<Tag> {
        let mut out = [b'0'; TAG_LEN];
        let mut carry = 0u8;
        for i in (0..TAG_LEN).rev() {
            let sum = (self.0[i] - b'0') + (other.0[i] - b'0') + carry;
            out[i] = b'0' + sum % 10;
            carry = sum / 10;
        }
        (carry == 0).then_some(Tag(out))
    }

    /// Digit-wise difference, `None` on borrow out of the top digit.
    pub fn checked_sub(&self, other: &Tag) -> Option<Tag> {
        let mut out = [b'0'; TAG_LEN];
        let mut borrow = 0i8;
        for i in (0..TAG_LEN).rev() {
            let mut diff = (self.0[i] - b'0') as i8 - (other.0[i] - b'0') as i8 - borrow;
            if diff < 0 {
                diff += 10;
                borrow = 1;
            } else {
                borrow = 0;
            }
            out[i] = b'0' + diff as u8;
        }
        (borrow == 0).then_some(Tag(out))
    }

    pub fn saturating_add(&self, other: &Tag) -> Tag {
        self.checked_add(other).unwrap_or_else(|| {
            warn!("Tag overflow: {} + {} clamped", self, other);
            Tag::max()
        })
    }

    pub fn saturating_sub(&self, other: &Tag) -> Tag {
        self.checked_sub(other).unwrap_or_else(|| {
            warn!("Tag underflow: {} - {} clamped", self, other);
            Tag::zero()
        })
    }

    /// Add one, clamping at all-nines.
    pub fn increment(&self) -> Tag {
        self.saturating_add(&Tag::from_u64(1))
    }

    /// Subtract one, clamping at zero.
    pub fn decrement(&self) -> Tag {
        self.saturating_sub(&Tag::from_u64(1))
    }
}

impl Default for Tag {
    fn default() -> Self {
        Self::zero()
    }
}

// Equal-width digit strings order the same lexicographically and numerically.
impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Digits are validated on construction.
        f.write_str(std::str::from_utf8(&self.0).map_err(|_| fmt::Error)?)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_string();
        let trimmed = text.trim_start_matches('0');
        write!(f, "Tag({})", if trimmed.is_empty() { "0" } else { trimmed })
    }
}

impl FromStr for Tag {
    type Err = CodecError;

    /// Parse a decimal string of up to 32 digits, left-padding with zeros.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > TAG_LEN {
            return Err(CodecError::FieldOverflow {
                value: s.to_string(),
                width: TAG_LEN,
            });
        }
        let mut padded = [b'0'; TAG_LEN];
        padded[TAG_LEN - s.len()..].copy_from_slice(s.as_bytes());
        Tag::from_digits(&padded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_u64_pads_left() {
        let tag = Tag::from_u64(42);
        assert_eq!(tag.to_string(), format!("{:0>32}", 42));
        assert_eq!(tag.low_u64(), 42);
    }

    #[test]
    fn test_from_digits_rejects_non_digit() {
        let mut raw = [b'0'; TAG_LEN];
        raw[7] = b'x';
        assert_eq!(
            Tag::from_digits(&raw),
            Err(CodecError::InvalidDigit {
                position: 7,
                byte: b'x'
            })
        );
    }

    #[test]
    fn test_from_digits_short_buffer() {
        assert!(matches!(
            Tag::from_digits(b"123"),
            Err(CodecError::ShortBuffer { expected: 32, actual: 3 })
        ));
    }

    #[test]
    fn test_add_carries_across_digits() {
        let a = Tag::from_u64(999);
        let b = Tag::from_u64(1);
        assert_eq!(a.checked_add(&b), Some(Tag::from_u64(1000)));
    }

    #[test]
    fn test_sub_borrows_across_digits() {
        let a = Tag::from_u64(1000);
        assert_eq!(a.checked_sub(&Tag::from_u64(1)), Some(Tag::from_u64(999)));
    }

    #[test]
    fn test_overflow_saturates() {
        assert_eq!(Tag::max().checked_add(&Tag::from_u64(1)), None);
        assert_eq!(Tag::max().increment(), Tag::max());
        assert_eq!(Tag::max().saturating_add(&Tag::max()), Tag::max());
    }

    #[test]
    fn test_underflow_saturates() {
        assert_eq!(Tag::zero().checked_sub(&Tag::from_u64(1)), None);
        assert_eq!(Tag::zero().decrement(), Tag::zero());
        assert_eq!(
            Tag::from_u64(5).saturating_sub(&Tag::from_u64(6)),
            Tag::zero()
        );
    }

    #[test]
    fn test_ordering_is_numeric() {
        assert!(Tag::from_u64(9) < Tag::from_u64(10));
        assert!(Tag::from_u64(100) > Tag::from_u64(99));
        assert_eq!(Tag::from_u64(7).cmp(&Tag::from_u64(7)), Ordering::Equal);
    }

    #[test]
    fn test_parse_pads_and_validates() {
        let tag: Tag = "100000".parse().unwrap();
        assert_eq!(tag, Tag::from_u64(100_000));
        assert!("12a".parse::<Tag>().is_err());
        assert!("1".repeat(33).parse::<Tag>().is_err());
    }

    fn digits(max_len: usize) -> impl Strategy<Value = Tag> {
        proptest::string::string_regex(&format!("[0-9]{{1,{max_len}}}"))
            .unwrap()
            .prop_map(|s| s.parse::<Tag>().unwrap())
    }

    proptest! {
        #[test]
        fn test_add_then_sub_is_identity(a in digits(31), b in digits(31)) {
            let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
            let sum = hi.saturating_add(&lo);
            prop_assert_eq!(sum.saturating_sub(&lo), hi);
        }

        #[test]
        fn test_increment_decrement_identity(a in digits(32)) {
            prop_assume!(!a.is_max());
            prop_assert_eq!(a.increment().decrement(), a);
        }

        #[test]
        fn test_ordering_matches_checked_sub(a in digits(32), b in digits(32)) {
            prop_assert_eq!(a >= b, a.checked_sub(&b).is_some());
        }
    }
}
