//! # Wire Messages
//!
//! Single-byte ASCII opcodes followed by fixed-width payloads. The only
//! variable-length frame is `SEND_PORTS`, whose size is given by its six-digit
//! count field.

use crate::entities::{Block, Hash32, Transaction, TRANSACTION_LEN};
use crate::errors::CodecError;
use crate::tag::{Tag, TAG_LEN};

/// Width of one decimal port or count field.
pub const PORT_FIELD_LEN: usize = 6;

/// Bootstrap registration: port field plus identity digest.
pub const REGISTRATION_LEN: usize = PORT_FIELD_LEN + TAG_LEN;

/// Leading byte of every peer frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    SendTransaction,
    SendBlock,
    GetBlock,
    GetHash,
    SendPorts,
    /// Anything else. Framing is lost once this is seen.
    Unknown(u8),
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'0' => Self::SendTransaction,
            b'1' => Self::SendBlock,
            b'2' => Self::GetBlock,
            b'3' => Self::GetHash,
            b'4' => Self::SendPorts,
            other => Self::Unknown(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::SendTransaction => b'0',
            Self::SendBlock => b'1',
            Self::GetBlock => b'2',
            Self::GetHash => b'3',
            Self::SendPorts => b'4',
            Self::Unknown(b) => b,
        }
    }

    /// Payload size after the opcode, when it does not depend on the payload.
    ///
    /// `SEND_PORTS` returns the size of its count field; the remainder is
    /// known only after that field is read.
    pub fn payload_len(self, txs_per_block: usize) -> Option<usize> {
        match self {
            Self::SendTransaction => Some(TRANSACTION_LEN),
            Self::SendBlock => Some(Block::payload_len(txs_per_block)),
            Self::GetBlock | Self::GetHash => Some(TAG_LEN),
            Self::SendPorts => Some(PORT_FIELD_LEN),
            Self::Unknown(_) => None,
        }
    }
}

/// A decoded peer frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    SendTransaction(Transaction),
    SendBlock(Block),
    GetBlock(Tag),
    GetHash(Tag),
    SendPorts(Vec<u16>),
}

impl Message {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::SendTransaction(_) => Opcode::SendTransaction,
            Self::SendBlock(_) => Opcode::SendBlock,
            Self::GetBlock(_) => Opcode::GetBlock,
            Self::GetHash(_) => Opcode::GetHash,
            Self::SendPorts(_) => Opcode::SendPorts,
        }
    }

    /// Full frame including the opcode byte.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::SendTransaction(tx) => {
                let mut out = Vec::with_capacity(1 + TRANSACTION_LEN);
                out.push(Opcode::SendTransaction.as_byte());
                tx.encode_into(&mut out);
                out
            }
            Self::SendBlock(block) => encode_send_block(block),
            Self::GetBlock(height) | Self::GetHash(height) => {
                let mut out = Vec::with_capacity(1 + TAG_LEN);
                out.push(self.opcode().as_byte());
                out.extend_from_slice(height.as_bytes());
                out
            }
            Self::SendPorts(ports) => encode_ports(ports),
        }
    }

    /// Decode a fixed-size payload. `SEND_PORTS` expects count field and
    /// port list together.
    pub fn decode_payload(
        opcode: Opcode,
        payload: &[u8],
        txs_per_block: usize,
    ) -> Result<Self, CodecError> {
        match opcode {
            Opcode::SendTransaction => Ok(Self::SendTransaction(Transaction::decode(payload)?)),
            Opcode::SendBlock => Ok(Self::SendBlock(Block::decode_payload(
                payload,
                txs_per_block,
            )?)),
            Opcode::GetBlock => Ok(Self::GetBlock(Tag::from_digits(payload)?)),
            Opcode::GetHash => Ok(Self::GetHash(Tag::from_digits(payload)?)),
            Opcode::SendPorts => {
                let count = decode_count(payload)?;
                let body = &payload[PORT_FIELD_LEN..];
                Ok(Self::SendPorts(decode_port_list(count, body)?))
            }
            Opcode::Unknown(b) => Err(CodecError::UnknownOpcode(b)),
        }
    }

    /// Decode a complete frame.
    pub fn decode(frame: &[u8], txs_per_block: usize) -> Result<Self, CodecError> {
        let (&first, payload) = frame.split_first().ok_or(CodecError::ShortBuffer {
            expected: 1,
            actual: 0,
        })?;
        Self::decode_payload(Opcode::from_byte(first), payload, txs_per_block)
    }
}

/// `SEND_BLOCK` frame for a block the caller only borrows.
pub fn encode_send_block(block: &Block) -> Vec<u8> {
    let mut out = vec![Opcode::SendBlock.as_byte()];
    out.extend_from_slice(&block.encode_payload());
    out
}

pub fn encode_port(port: u16) -> [u8; PORT_FIELD_LEN] {
    let mut out = [b'0'; PORT_FIELD_LEN];
    out.copy_from_slice(format!("{:06}", port).as_bytes());
    out
}

fn decode_decimal(field: &[u8]) -> Result<u32, CodecError> {
    if field.len() < PORT_FIELD_LEN {
        return Err(CodecError::ShortBuffer {
            expected: PORT_FIELD_LEN,
            actual: field.len(),
        });
    }
    field[..PORT_FIELD_LEN]
        .iter()
        .enumerate()
        .try_fold(0u32, |acc, (position, &byte)| {
            if byte.is_ascii_digit() {
                Ok(acc * 10 + u32::from(byte - b'0'))
            } else {
                Err(CodecError::InvalidDigit { position, byte })
            }
        })
}

pub fn decode_port(field: &[u8]) -> Result<u16, CodecError> {
    let value = decode_decimal(field)?;
    u16::try_from(value)
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| CodecError::InvalidPort(value.to_string()))
}

/// Six-digit entry count at the head of a `SEND_PORTS` body.
pub fn decode_count(field: &[u8]) -> Result<usize, CodecError> {
    Ok(decode_decimal(field)? as usize)
}

pub fn decode_port_list(count: usize, body: &[u8]) -> Result<Vec<u16>, CodecError> {
    let expected = count * PORT_FIELD_LEN;
    if body.len() < expected {
        return Err(CodecError::ShortBuffer {
            expected,
            actual: body.len(),
        });
    }
    body[..expected]
        .chunks_exact(PORT_FIELD_LEN)
        .map(decode_port)
        .collect()
}

/// `'4' ‖ count ‖ ports`.
pub fn encode_ports(ports: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + PORT_FIELD_LEN * (ports.len() + 1));
    out.push(Opcode::SendPorts.as_byte());
    out.extend_from_slice(format!("{:06}", ports.len()).as_bytes());
    for &port in ports {
        out.extend_from_slice(&encode_port(port));
    }
    out
}

/// A worker announcing one of its listening ports to the rendezvous service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Registration {
    pub port: u16,
    pub identity: Hash32,
}

impl Registration {
    pub fn encode(&self) -> [u8; REGISTRATION_LEN] {
        let mut out = [0u8; REGISTRATION_LEN];
        out[..PORT_FIELD_LEN].copy_from_slice(&encode_port(self.port));
        out[PORT_FIELD_LEN..].copy_from_slice(self.identity.as_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < REGISTRATION_LEN {
            return Err(CodecError::ShortBuffer {
                expected: REGISTRATION_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            port: decode_port(&bytes[..PORT_FIELD_LEN])?,
            identity: Hash32::from_slice(&bytes[PORT_FIELD_LEN..REGISTRATION_LEN])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::identity_from_seed;

    #[test]
    fn test_opcodes_are_ascii_digits() {
        for (byte, op) in [
            (b'0', Opcode::SendTransaction),
            (b'1', Opcode::SendBlock),
            (b'2', Opcode::GetBlock),
            (b'3', Opcode::GetHash),
            (b'4', Opcode::SendPorts),
        ] {
            assert_eq!(Opcode::from_byte(byte), op);
            assert_eq!(op.as_byte(), byte);
        }
        assert_eq!(Opcode::from_byte(b'9'), Opcode::Unknown(b'9'));
    }

    #[test]
    fn test_unknown_opcode_is_an_error() {
        assert_eq!(
            Message::decode(b"x123", 1),
            Err(CodecError::UnknownOpcode(b'x'))
        );
    }

    #[test]
    fn test_get_hash_frame() {
        let frame = Message::GetHash(Tag::from_u64(12)).encode();
        assert_eq!(frame.len(), 33);
        assert_eq!(frame[0], b'3');
        assert_eq!(
            Message::decode(&frame, 1).unwrap(),
            Message::GetHash(Tag::from_u64(12))
        );
    }

    #[test]
    fn test_send_ports_layout() {
        let frame = encode_ports(&[8001, 65535]);
        assert_eq!(&frame[..], b"4000002008001065535");
        assert_eq!(
            Message::decode(&frame, 1).unwrap(),
            Message::SendPorts(vec![8001, 65535])
        );
    }

    #[test]
    fn test_port_out_of_range_rejected() {
        assert!(matches!(
            decode_port(b"070000"),
            Err(CodecError::InvalidPort(_))
        ));
        assert!(matches!(decode_port(b"000000"), Err(CodecError::InvalidPort(_))));
    }

    #[test]
    fn test_registration_layout() {
        let reg = Registration {
            port: 9000,
            identity: identity_from_seed("jfv47"),
        };
        let raw = reg.encode();
        assert_eq!(&raw[..6], b"009000");
        assert_eq!(Registration::decode(&raw).unwrap(), reg);
    }

    #[test]
    fn test_payload_len_for_block_scales_with_n() {
        assert_eq!(Opcode::SendBlock.payload_len(2), Some(160 + 256));
        assert_eq!(Opcode::Unknown(0).payload_len(2), None);
    }
}
