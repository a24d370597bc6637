//! Resumable frame reader.
//!
//! One reader per connection. A frame is read in stages (opcode, payload,
//! and for `SEND_PORTS` the port list) and each stage may take several
//! readiness events to fill. The reader remembers where it stopped, so a job
//! that hits would-block returns the connection to the event loop and the
//! next job continues from the same byte.
//!
//! ```text
//! boundary ──awaiting hash──→ [HashReply 32] ─────────────────────→ Frame::HashReply
//!    │
//!    └──→ [Opcode 1] ──→ [Payload len(op)] ──────────────────────→ Frame::Message
//!                              │ SEND_PORTS
//!                              └──→ count ──→ [PortList 6*count] ─→ Frame::Message
//! ```
//!
//! A GET_HASH reply carries no opcode, so it can only be recognised by the
//! connection's search state: while a session awaits a hash, the next 32
//! bytes at a frame boundary are taken as the reply.

use std::time::{Duration, Instant};

use dc_01_peer_io::{InboundBuffer, PeerIoError, RawSocket, ReadOutcome};
use shared_types::{
    decode_count, decode_port_list, CodecError, Hash32, Message, Opcode, PORT_FIELD_LEN, TAG_LEN,
};
use tokio::net::TcpStream;

use crate::error::Result;

/// A complete unit read from a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Message(Message),
    HashReply(Hash32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Opcode,
    HashReply,
    Payload(Opcode),
    PortList { count: usize },
}

#[derive(Debug)]
pub struct FrameReader {
    txs_per_block: usize,
    stage: Stage,
    buf: InboundBuffer,
    last_progress: Option<Instant>,
}

impl FrameReader {
    pub fn new(txs_per_block: usize) -> Self {
        Self {
            txs_per_block,
            stage: Stage::Opcode,
            buf: InboundBuffer::new(),
            last_progress: None,
        }
    }

    /// True once any byte of the current frame has arrived.
    pub fn is_mid_frame(&self) -> bool {
        self.last_progress.is_some()
    }

    /// Time since the last byte of an unfinished frame.
    pub fn stalled_for(&self, now: Instant) -> Option<Duration> {
        self.last_progress.map(|t| now.saturating_duration_since(t))
    }

    /// Read what the socket has. `Ok(None)` means the socket would block
    /// before the frame finished.
    pub fn poll<S: RawSocket + ?Sized>(
        &mut self,
        socket: &S,
        awaiting_hash: bool,
    ) -> Result<Option<Frame>> {
        if !self.is_mid_frame() {
            self.start_frame(awaiting_hash);
        }
        loop {
            let before = self.buf.filled();
            let outcome = self.buf.fill_from(socket)?;
            if self.buf.filled() > before {
                self.last_progress = Some(Instant::now());
            }
            match outcome {
                ReadOutcome::Closed => return Err(PeerIoError::Closed.into()),
                ReadOutcome::Pending { .. } => return Ok(None),
                ReadOutcome::Complete => {}
            }
            let bytes = self.buf.take();
            if let Some(frame) = self.advance(&bytes)? {
                self.last_progress = None;
                self.stage = Stage::Opcode;
                return Ok(Some(frame));
            }
        }
    }

    /// A GET_HASH reply carries no opcode, so while a search waits for one
    /// the next 32 bytes at a frame boundary are taken as the hash. A frame
    /// already in progress still finishes as a message. A broadcast the peer
    /// writes between our request and its reply is misread as the hash; the
    /// search then fails on linkage or the session sweep, and the connection
    /// is closed on the resulting protocol error.
    fn start_frame(&mut self, awaiting_hash: bool) {
        let (stage, len) = if awaiting_hash {
            (Stage::HashReply, TAG_LEN)
        } else {
            (Stage::Opcode, 1)
        };
        if self.stage != stage || self.buf.is_idle() {
            self.stage = stage;
            self.buf.expect(len);
        }
    }

    /// Consume a completed stage. Returns the frame when it is finished,
    /// otherwise arms the buffer for the next stage.
    fn advance(&mut self, bytes: &[u8]) -> Result<Option<Frame>> {
        match self.stage {
            Stage::HashReply => Ok(Some(Frame::HashReply(Hash32::from_slice(bytes)?))),
            Stage::Opcode => {
                let opcode = Opcode::from_byte(bytes[0]);
                let len = opcode
                    .payload_len(self.txs_per_block)
                    .ok_or(CodecError::UnknownOpcode(bytes[0]))?;
                self.stage = Stage::Payload(opcode);
                self.buf.expect(len);
                Ok(None)
            }
            Stage::Payload(Opcode::SendPorts) => {
                let count = decode_count(bytes)?;
                if count == 0 {
                    return Ok(Some(Frame::Message(Message::SendPorts(Vec::new()))));
                }
                self.stage = Stage::PortList { count };
                self.buf.expect(count * PORT_FIELD_LEN);
                Ok(None)
            }
            Stage::Payload(opcode) => Ok(Some(Frame::Message(Message::decode_payload(
                opcode,
                bytes,
                self.txs_per_block,
            )?))),
            Stage::PortList { count } => Ok(Some(Frame::Message(Message::SendPorts(
                decode_port_list(count, bytes)?,
            )))),
        }
    }
}

/// Wait for the next complete frame, giving up after `stall` without
/// progress.
pub async fn next_frame(
    stream: &TcpStream,
    reader: &mut FrameReader,
    awaiting_hash: bool,
    stall: Duration,
) -> Result<Frame> {
    let started = Instant::now();
    loop {
        if let Some(frame) = reader.poll(stream, awaiting_hash)? {
            return Ok(frame);
        }
        if tokio::time::timeout(stall, stream.readable()).await.is_err() {
            return Err(PeerIoError::Stalled {
                waited: started.elapsed(),
                filled: reader.buf.filled(),
                expected: reader.buf.expected(),
            }
            .into());
        }
    }
}
