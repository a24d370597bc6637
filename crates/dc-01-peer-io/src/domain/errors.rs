//! Peer I/O error types.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PeerIoError>;

#[derive(Debug, Error)]
pub enum PeerIoError {
    /// The peer closed the stream (zero-length read or write).
    #[error("Connection closed by peer")]
    Closed,

    /// A job waited too long for the rest of a fixed-size field.
    #[error("Read stalled after {waited:?}: {filled}/{expected} bytes")]
    Stalled {
        waited: Duration,
        filled: usize,
        expected: usize,
    },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Socket error: {0}")]
    Io(#[from] io::Error),
}

impl PeerIoError {
    /// Errors after which the connection must be dropped.
    pub fn is_fatal_for_connection(&self) -> bool {
        !matches!(self, Self::Bind { .. } | Self::Connect { .. })
    }
}
