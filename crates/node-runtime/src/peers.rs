//! Live peer connections.
//!
//! Each connection owns its socket, its pending outbound bytes, its frame
//! reader and, in event-driven sync mode, at most one ancestor-search
//! session. Those per-connection pieces have their own small locks (the
//! outbound lock is taken before the readiness book's); only the
//! job that has claimed the connection in the readiness book reads from it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dc_01_peer_io::{send_now, OutboundBuffer, ReadinessBook, WriteOutcome};
use dc_05_reconciliation::{AncestorSearch, SyncState};
use parking_lot::{Mutex, RwLock};
use tokio::net::TcpStream;

use crate::error::Result;
use crate::framing::{Frame, FrameReader};
use crate::sessions::SearchSession;

pub type ConnId = u64;

/// How the connection came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// A peer dialled one of our listening ports.
    Accepted { local_port: u16 },
    /// We dialled a peer after a membership update. Broadcasts use these.
    Outbound { remote_port: u16 },
}

#[derive(Debug)]
pub struct Connection {
    id: ConnId,
    peer: SocketAddr,
    direction: Direction,
    stream: TcpStream,
    txs_per_block: usize,
    outbound: Mutex<OutboundBuffer>,
    reader: Mutex<FrameReader>,
    session: Mutex<Option<SearchSession>>,
}

impl Connection {
    pub fn new(
        id: ConnId,
        peer: SocketAddr,
        direction: Direction,
        stream: TcpStream,
        txs_per_block: usize,
    ) -> Self {
        Self {
            id,
            peer,
            direction,
            stream,
            txs_per_block,
            outbound: Mutex::new(OutboundBuffer::new()),
            reader: Mutex::new(FrameReader::new(txs_per_block)),
            session: Mutex::new(None),
        }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_outbound(&self) -> bool {
        matches!(self.direction, Direction::Outbound { .. })
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    // ---------------------------------------------------------------------
    // Writing
    // ---------------------------------------------------------------------

    /// Write now, queueing whatever would block.
    ///
    /// The write-interest mark in `book` is updated while the outbound lock
    /// is still held, so it always matches the queue a concurrent flush sees.
    pub fn send(&self, bytes: &[u8], book: &ReadinessBook<ConnId>) -> Result<WriteOutcome> {
        let mut outbound = self.outbound.lock();
        let outcome = outbound.send(&self.stream, bytes)?;
        book.set_pending_write(self.id, !outbound.is_empty());
        Ok(outcome)
    }

    pub fn flush(&self, book: &ReadinessBook<ConnId>) -> Result<WriteOutcome> {
        let mut outbound = self.outbound.lock();
        let outcome = outbound.flush(&self.stream)?;
        book.set_pending_write(self.id, !outbound.is_empty());
        Ok(outcome)
    }

    pub fn has_pending_output(&self) -> bool {
        !self.outbound.lock().is_empty()
    }

    /// Write `bytes` completely before returning, after anything queued.
    pub async fn send_blocking(&self, bytes: &[u8]) -> Result<()> {
        let mut frame = self.outbound.lock().take_pending();
        frame.extend_from_slice(bytes);
        send_now(&self.stream, &frame).await?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Reading
    // ---------------------------------------------------------------------

    /// Continue the current frame. The search state decides whether a
    /// raw hash reply is expected at the next frame boundary.
    pub fn poll_frame(&self) -> Result<Option<Frame>> {
        let awaiting_hash = self.awaiting_hash();
        self.reader.lock().poll(&self.stream, awaiting_hash)
    }

    /// Take the reader out for a job that reads inline across awaits.
    pub fn take_reader(&self) -> FrameReader {
        std::mem::replace(&mut *self.reader.lock(), FrameReader::new(self.txs_per_block))
    }

    pub fn restore_reader(&self, reader: FrameReader) {
        *self.reader.lock() = reader;
    }

    pub fn read_stalled_for(&self, now: Instant) -> Option<Duration> {
        self.reader.lock().stalled_for(now)
    }

    // ---------------------------------------------------------------------
    // Search session
    // ---------------------------------------------------------------------

    pub fn sync_state(&self) -> SyncState {
        self.session
            .lock()
            .as_ref()
            .map_or(SyncState::Ready, |s| s.search.state())
    }

    pub fn awaiting_hash(&self) -> bool {
        matches!(self.sync_state(), SyncState::AwaitingHash { .. })
    }

    /// Install a new search, returning the one it replaces.
    pub fn begin_session(&self, search: AncestorSearch) -> Option<SearchSession> {
        self.session.lock().replace(SearchSession::new(search))
    }

    pub fn take_session(&self) -> Option<SearchSession> {
        self.session.lock().take()
    }

    pub fn resume_session(&self, mut session: SearchSession) {
        session.touch();
        *self.session.lock() = Some(session);
    }

    pub fn session_idle_for(&self, now: Instant) -> Option<Duration> {
        self.session.lock().as_ref().map(|s| s.idle_for(now))
    }
}

/// Every live connection, by id.
#[derive(Debug, Default)]
pub struct PeerTable {
    next_id: AtomicU64,
    connections: RwLock<HashMap<ConnId, Arc<Connection>>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        direction: Direction,
        txs_per_block: usize,
    ) -> Arc<Connection> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let conn = Arc::new(Connection::new(id, peer, direction, stream, txs_per_block));
        self.connections.write().insert(id, conn.clone());
        conn
    }

    pub fn remove(&self, id: ConnId) -> Option<Arc<Connection>> {
        self.connections.write().remove(&id)
    }

    pub fn get(&self, id: ConnId) -> Option<Arc<Connection>> {
        self.connections.read().get(&id).cloned()
    }

    pub fn ids(&self) -> Vec<ConnId> {
        self.connections.read().keys().copied().collect()
    }

    pub fn all(&self) -> Vec<Arc<Connection>> {
        self.connections.read().values().cloned().collect()
    }

    pub fn outbound(&self) -> Vec<Arc<Connection>> {
        self.connections
            .read()
            .values()
            .filter(|c| c.is_outbound())
            .cloned()
            .collect()
    }

    pub fn has_outbound(&self, port: u16) -> bool {
        self.connections
            .read()
            .values()
            .any(|c| c.direction == Direction::Outbound { remote_port: port })
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
