//! Per-socket pending byte buffers.
//!
//! Each connection owns one [`InboundBuffer`] and one [`OutboundBuffer`].
//! Neither type locks; the owning connection serialises access.

use std::io::ErrorKind;

use tracing::trace;

use super::errors::{PeerIoError, Result};
use crate::ports::RawSocket;

/// Result of trying to fill an [`InboundBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The expected length is fully buffered.
    Complete,
    /// The socket would block; `filled` bytes are kept for the next attempt.
    Pending { filled: usize },
    /// End-of-stream.
    Closed,
}

/// Accumulates one fixed-size field across readiness events.
#[derive(Debug, Default)]
pub struct InboundBuffer {
    buf: Vec<u8>,
    filled: usize,
}

impl InboundBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start accumulating a field of `len` bytes, discarding anything held.
    pub fn expect(&mut self, len: usize) {
        self.buf.clear();
        self.buf.resize(len, 0);
        self.filled = 0;
    }

    /// True when no field is being accumulated.
    pub fn is_idle(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn expected(&self) -> usize {
        self.buf.len()
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn is_complete(&self) -> bool {
        !self.buf.is_empty() && self.filled == self.buf.len()
    }

    /// Read as much of the expected field as the socket has available.
    pub fn fill_from<S: RawSocket + ?Sized>(&mut self, socket: &S) -> Result<ReadOutcome> {
        while self.filled < self.buf.len() {
            match socket.try_read(&mut self.buf[self.filled..]) {
                Ok(0) => return Ok(ReadOutcome::Closed),
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    trace!("[dc-01] read pending at {}/{}", self.filled, self.buf.len());
                    return Ok(ReadOutcome::Pending {
                        filled: self.filled,
                    });
                }
                Err(e) => return Err(PeerIoError::Io(e)),
            }
        }
        Ok(ReadOutcome::Complete)
    }

    /// Hand over the completed field and return to idle.
    pub fn take(&mut self) -> Vec<u8> {
        self.filled = 0;
        std::mem::take(&mut self.buf)
    }
}

/// Result of a send or flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Everything reached the kernel.
    Flushed,
    /// `pending` bytes wait for the socket to become writable.
    Queued { pending: usize },
}

/// Bytes that could not be written yet, in send order.
#[derive(Debug, Default)]
pub struct OutboundBuffer {
    pending: Vec<u8>,
}

impl OutboundBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Write `bytes` now if possible, queueing whatever would block.
    ///
    /// If older bytes are still queued the new ones go behind them so the
    /// peer never sees frames out of order.
    pub fn send<S: RawSocket + ?Sized>(&mut self, socket: &S, bytes: &[u8]) -> Result<WriteOutcome> {
        if !self.pending.is_empty() {
            self.pending.extend_from_slice(bytes);
            return self.flush(socket);
        }
        let written = write_some(socket, bytes)?;
        if written < bytes.len() {
            self.pending.extend_from_slice(&bytes[written..]);
            trace!("[dc-01] queued {} bytes", self.pending.len());
            return Ok(WriteOutcome::Queued {
                pending: self.pending.len(),
            });
        }
        Ok(WriteOutcome::Flushed)
    }

    /// Retry queued bytes; called when the socket reports writable.
    pub fn flush<S: RawSocket + ?Sized>(&mut self, socket: &S) -> Result<WriteOutcome> {
        if self.pending.is_empty() {
            return Ok(WriteOutcome::Flushed);
        }
        let written = write_some(socket, &self.pending)?;
        self.pending.drain(..written);
        if self.pending.is_empty() {
            Ok(WriteOutcome::Flushed)
        } else {
            Ok(WriteOutcome::Queued {
                pending: self.pending.len(),
            })
        }
    }

    /// Remove queued bytes so a blocking sender can write them first.
    pub fn take_pending(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending)
    }
}

/// Write until done or would-block. Returns bytes written.
fn write_some<S: RawSocket + ?Sized>(socket: &S, bytes: &[u8]) -> Result<usize> {
    let mut written = 0;
    while written < bytes.len() {
        match socket.try_write(&bytes[written..]) {
            Ok(0) => return Err(PeerIoError::Closed),
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(e) => return Err(PeerIoError::Io(e)),
        }
    }
    Ok(written)
}
