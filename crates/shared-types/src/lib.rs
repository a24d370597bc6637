//! # Shared Types Crate
//!
//! Fixed-width wire codec and core entities shared by every Decichain
//! subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every on-wire layout is defined here and
//!   nowhere else.
//! - **Decode Once**: raw bytes become a tagged [`Message`] at the boundary;
//!   unknown opcodes surface as an explicit [`Opcode::Unknown`] variant.
//! - **Digit Tags**: heights, nonces, and amounts are 32 ASCII decimal digits
//!   with saturating arithmetic ([`Tag`]).
//!
//! ## Wire Layouts
//!
//! ```text
//! Transaction   sender(32) | receiver(32) | amount(32) | timestamp(32)   = 128
//! BlockHeader   nonce(32) | prior(32) | hash(32) | height(32) | miner(32) = 160
//! SEND_BLOCK    '1' | header | N x transaction
//! GET_BLOCK     '2' | height(32)
//! GET_HASH      '3' | height(32)          reply: raw hash(32), no opcode
//! SEND_PORTS    '4' | count(6) | count x port(6)
//! Registration  port(6) | identity(32)    (no opcode)
//! ```

pub mod entities;
pub mod errors;
pub mod hashing;
pub mod tag;
pub mod wire;

pub use entities::*;
pub use errors::*;
pub use hashing::*;
pub use tag::*;
pub use wire::*;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
