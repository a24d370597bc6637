//! tokio `TcpStream` binding plus listener and connect helpers.

use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{debug, info};

use crate::domain::{InboundBuffer, PeerIoError, ReadOutcome, Result};
use crate::ports::RawSocket;

impl RawSocket for TcpStream {
    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        TcpStream::try_read(self, buf)
    }

    fn try_write(&self, buf: &[u8]) -> io::Result<usize> {
        TcpStream::try_write(self, buf)
    }
}

/// Bind a listening socket with `SO_REUSEADDR` set.
pub fn bind_listener(addr: SocketAddr, backlog: u32) -> Result<TcpListener> {
    let bind_err = |source| PeerIoError::Bind { addr, source };
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(bind_err)?;
    socket.set_reuseaddr(true).map_err(bind_err)?;
    socket.bind(addr).map_err(bind_err)?;
    let listener = socket.listen(backlog).map_err(bind_err)?;
    info!("[dc-01] listening on {}", addr);
    Ok(listener)
}

pub async fn connect(addr: SocketAddr) -> Result<TcpStream> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| PeerIoError::Connect { addr, source })?;
    stream.set_nodelay(true)?;
    debug!("[dc-01] connected to {}", addr);
    Ok(stream)
}

/// Write every byte before returning, waiting for writability as needed.
///
/// Used where the caller cannot continue until the frame is on the wire
/// (ancestor-search requests in the blocking sync mode, bootstrap
/// registration). Interrupted writes are retried.
pub async fn send_now(stream: &TcpStream, bytes: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < bytes.len() {
        stream.writable().await?;
        match stream.try_write(&bytes[written..]) {
            Ok(0) => return Err(PeerIoError::Closed),
            Ok(n) => written += n,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                continue
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Fill `inbound` completely, waiting on readiness between attempts.
///
/// Gives up with [`PeerIoError::Stalled`] if no progress is made for
/// `stall`. A job that owns a connection uses this to finish the field it
/// started without returning to the event loop.
pub async fn read_full(stream: &TcpStream, inbound: &mut InboundBuffer, stall: Duration) -> Result<()> {
    let started = Instant::now();
    loop {
        match inbound.fill_from(stream)? {
            ReadOutcome::Complete => return Ok(()),
            ReadOutcome::Closed => return Err(PeerIoError::Closed),
            ReadOutcome::Pending { filled } => {
                if tokio::time::timeout(stall, stream.readable()).await.is_err() {
                    return Err(PeerIoError::Stalled {
                        waited: started.elapsed(),
                        filled,
                        expected: inbound.expected(),
                    });
                }
            }
        }
    }
}

/// Read exactly `len` bytes (convenience wrapper over [`read_full`]).
pub async fn read_exact(stream: &TcpStream, len: usize, stall: Duration) -> Result<Vec<u8>> {
    let mut inbound = InboundBuffer::new();
    inbound.expect(len);
    read_full(stream, &mut inbound, stall).await?;
    Ok(inbound.take())
}
