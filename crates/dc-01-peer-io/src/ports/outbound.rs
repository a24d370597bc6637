//! Outbound (Driven) ports for the Peer I/O subsystem.
//!
//! The buffers only need non-blocking read/write attempts from a socket, so
//! they are written against this trait rather than a concrete stream.

use std::io;

/// A non-blocking byte stream.
///
/// Both calls must return `ErrorKind::WouldBlock` instead of waiting.
pub trait RawSocket: Send + Sync {
    /// `Ok(0)` means end-of-stream.
    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize>;

    fn try_write(&self, buf: &[u8]) -> io::Result<usize>;
}

/// Scripted socket for testing partial reads and would-block writes.
#[cfg(any(test, feature = "test-utils"))]
pub struct ScriptedSocket {
    reads: parking_lot::Mutex<std::collections::VecDeque<io::Result<Vec<u8>>>>,
    write_limits: parking_lot::Mutex<std::collections::VecDeque<io::Result<usize>>>,
    written: parking_lot::Mutex<Vec<u8>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl ScriptedSocket {
    pub fn new() -> Self {
        Self {
            reads: parking_lot::Mutex::new(std::collections::VecDeque::new()),
            write_limits: parking_lot::Mutex::new(std::collections::VecDeque::new()),
            written: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Next read yields these bytes.
    pub fn push_read(&self, bytes: &[u8]) -> &Self {
        self.reads.lock().push_back(Ok(bytes.to_vec()));
        self
    }

    pub fn push_read_err(&self, kind: io::ErrorKind) -> &Self {
        self.reads.lock().push_back(Err(kind.into()));
        self
    }

    /// Next write accepts at most `limit` bytes.
    pub fn push_write_limit(&self, limit: usize) -> &Self {
        self.write_limits.lock().push_back(Ok(limit));
        self
    }

    pub fn push_write_err(&self, kind: io::ErrorKind) -> &Self {
        self.write_limits.lock().push_back(Err(kind.into()));
        self
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl RawSocket for ScriptedSocket {
    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut reads = self.reads.lock();
        match reads.pop_front() {
            None => Err(io::ErrorKind::WouldBlock.into()),
            Some(Err(e)) => Err(e),
            Some(Ok(mut chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    reads.push_front(Ok(chunk.split_off(n)));
                }
                Ok(n)
            }
        }
    }

    fn try_write(&self, buf: &[u8]) -> io::Result<usize> {
        // Unscripted writes accept everything.
        let limit = match self.write_limits.lock().pop_front() {
            None => buf.len(),
            Some(Err(e)) => return Err(e),
            Some(Ok(limit)) => limit,
        };
        let n = limit.min(buf.len());
        if n == 0 && !buf.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        self.written.lock().extend_from_slice(&buf[..n]);
        Ok(n)
    }
}
