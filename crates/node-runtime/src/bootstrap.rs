//! # Rendezvous Service
//!
//! The membership directory workers register with (`-bootstrap`).
//!
//! ```text
//! worker ──connect──→ rendezvous
//!        ──port(6)‖identity(32) × ports──→      record registrants
//!        ←──'4'‖count‖ports────────────────     announce to everyone
//!        (registration socket closed)
//!
//! later registration by another worker:
//!   rendezvous ──connect to each earlier registrant's port──→ SEND_PORTS, close
//! ```
//!
//! Announcements go over a registrant's own registration socket while it is
//! still open, otherwise the service dials the registrant's listening port
//! and the worker handles the frame like any other `SEND_PORTS`.

use std::collections::{HashMap, HashSet};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use dc_01_peer_io::{bind_listener, connect, send_now, InboundBuffer, ReadOutcome};
use futures::stream::{FuturesUnordered, StreamExt};
use shared_types::{encode_ports, Address, Registration, REGISTRATION_LEN};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Bound on dialling a registrant back.
const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registrant {
    pub registration: Registration,
    pub host: IpAddr,
    socket: Option<u64>,
}

struct RegistrationSocket {
    stream: TcpStream,
    peer: SocketAddr,
    inbound: InboundBuffer,
}

enum Event {
    Shutdown,
    Accepted(io::Result<(TcpStream, SocketAddr)>),
    Readable(u64),
}

pub struct Rendezvous {
    listener: TcpListener,
    registrants: Vec<Registrant>,
    sockets: HashMap<u64, RegistrationSocket>,
    next_socket: u64,
}

impl Rendezvous {
    pub fn bind(addr: SocketAddr, backlog: u32) -> Result<Self> {
        Ok(Self::from_listener(bind_listener(addr, backlog)?))
    }

    pub fn from_listener(listener: TcpListener) -> Self {
        Self {
            listener,
            registrants: Vec::new(),
            sockets: HashMap::new(),
            next_socket: 0,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registrants(&self) -> &[Registrant] {
        &self.registrants
    }

    /// Registered ports in registration order.
    pub fn ports(&self) -> Vec<u16> {
        self.registrants.iter().map(|r| r.registration.port).collect()
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!("Rendezvous service listening on {:?}", self.local_addr());
        loop {
            let event = {
                let mut readable: FuturesUnordered<_> = self
                    .sockets
                    .iter()
                    .map(|(&id, socket)| async move {
                        // Errors surface on the read that follows.
                        let _ = socket.stream.readable().await;
                        id
                    })
                    .collect();

                tokio::select! {
                    _ = shutdown.changed() => Event::Shutdown,
                    accepted = self.listener.accept() => Event::Accepted(accepted),
                    Some(id) = readable.next(), if !readable.is_empty() => Event::Readable(id),
                }
            };

            match event {
                Event::Shutdown => break,
                Event::Accepted(Ok((stream, peer))) => {
                    self.next_socket += 1;
                    debug!("Registration connection from {}", peer);
                    self.sockets.insert(
                        self.next_socket,
                        RegistrationSocket {
                            stream,
                            peer,
                            inbound: InboundBuffer::new(),
                        },
                    );
                }
                Event::Accepted(Err(e)) => warn!("Rendezvous accept failed: {}", e),
                Event::Readable(id) => {
                    if self.read_registrations(id) > 0 {
                        self.announce().await;
                    }
                }
            }
        }
        info!("Rendezvous service stopped");
        Ok(())
    }

    /// Drain complete registrations from one socket. Returns how many were
    /// recorded.
    fn read_registrations(&mut self, id: u64) -> usize {
        let Some(socket) = self.sockets.get_mut(&id) else {
            return 0;
        };
        let host = socket.peer.ip();
        let mut received = Vec::new();
        let mut closed = false;
        loop {
            if socket.inbound.is_idle() {
                socket.inbound.expect(REGISTRATION_LEN);
            }
            match socket.inbound.fill_from(&socket.stream) {
                Ok(ReadOutcome::Complete) => match Registration::decode(&socket.inbound.take()) {
                    Ok(registration) => received.push(registration),
                    Err(e) => {
                        warn!("Bad registration from {}: {}", socket.peer, e);
                        closed = true;
                        break;
                    }
                },
                Ok(ReadOutcome::Pending { .. }) => break,
                Ok(ReadOutcome::Closed) => {
                    debug!("Registration socket {} closed", socket.peer);
                    closed = true;
                    break;
                }
                Err(e) => {
                    warn!("Registration socket {} failed: {}", socket.peer, e);
                    closed = true;
                    break;
                }
            }
        }

        if closed {
            self.sockets.remove(&id);
            for registrant in &mut self.registrants {
                if registrant.socket == Some(id) {
                    registrant.socket = None;
                }
            }
        }
        let recorded = received.len();
        for registration in received {
            self.record(registration, host, if closed { None } else { Some(id) });
        }
        recorded
    }

    fn record(&mut self, registration: Registration, host: IpAddr, socket: Option<u64>) {
        info!(
            "Registered port {} (identity {})",
            registration.port, registration.identity
        );
        let entry = Registrant {
            registration,
            host,
            socket,
        };
        match self
            .registrants
            .iter_mut()
            .find(|r| r.registration.port == registration.port && r.host == host)
        {
            Some(existing) => *existing = entry,
            None => self.registrants.push(entry),
        }
    }

    /// Send the full port list to every registrant, then close every
    /// registration socket.
    async fn announce(&mut self) {
        let frame = encode_ports(&self.ports());
        let sockets = std::mem::take(&mut self.sockets);
        let mut reached: HashSet<u64> = HashSet::new();

        for (id, socket) in &sockets {
            match send_now(&socket.stream, &frame).await {
                Ok(()) => {
                    reached.insert(*id);
                }
                Err(e) => warn!("Announcement to {} failed: {}", socket.peer, e),
            }
        }
        drop(sockets);

        for registrant in &mut self.registrants {
            let via_socket = registrant.socket.take().is_some_and(|id| reached.contains(&id));
            if via_socket {
                continue;
            }
            let addr = SocketAddr::new(registrant.host, registrant.registration.port);
            if let Err(e) = dial_and_send(addr, &frame).await {
                warn!("Announcement to {} failed: {}", addr, e);
            }
        }
        info!("Announced {} ports", self.registrants.len());
    }
}

async fn dial_and_send(addr: SocketAddr, frame: &[u8]) -> Result<()> {
    let stream = tokio::time::timeout(DIAL_TIMEOUT, connect(addr))
        .await
        .map_err(|_| dc_01_peer_io::PeerIoError::Connect {
            addr,
            source: io::ErrorKind::TimedOut.into(),
        })??;
    send_now(&stream, frame).await?;
    Ok(())
}

/// Connect to the rendezvous service and register every local port in one
/// write. The returned socket carries the first peer list.
pub async fn register_with_rendezvous(
    addr: SocketAddr,
    ports: &[u16],
    identity: Address,
) -> Result<TcpStream> {
    let stream = connect(addr).await?;
    let mut bytes = Vec::with_capacity(ports.len() * REGISTRATION_LEN);
    for &port in ports {
        bytes.extend_from_slice(&Registration { port, identity }.encode());
    }
    send_now(&stream, &bytes).await?;
    info!("Registered {} ports with rendezvous {}", ports.len(), addr);
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dc_01_peer_io::read_exact;
    use shared_types::{decode_port_list, identity_from_seed, PORT_FIELD_LEN};

    const WAIT: Duration = Duration::from_secs(5);

    async fn read_port_list(stream: &TcpStream) -> Vec<u16> {
        let head = read_exact(stream, 1 + PORT_FIELD_LEN, WAIT).await.unwrap();
        assert_eq!(head[0], b'4');
        let count = shared_types::decode_count(&head[1..]).unwrap();
        let body = read_exact(stream, count * PORT_FIELD_LEN, WAIT).await.unwrap();
        decode_port_list(count, &body).unwrap()
    }

    fn start() -> (SocketAddr, watch::Sender<bool>, tokio::task::JoinHandle<Result<()>>) {
        let rendezvous = Rendezvous::bind("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = rendezvous.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        (addr, tx, tokio::spawn(rendezvous.run(rx)))
    }

    #[tokio::test]
    async fn test_registration_is_answered_on_the_same_socket() {
        let (addr, shutdown, task) = start();
        let identity = identity_from_seed("jfv47");

        let stream = register_with_rendezvous(addr, &[7001, 7002], identity)
            .await
            .unwrap();
        assert_eq!(read_port_list(&stream).await, vec![7001, 7002]);

        shutdown.send(true).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_earlier_registrant_is_dialled_back() {
        let (addr, shutdown, task) = start();
        let identity = identity_from_seed("jfv47");

        // The first worker listens so the service can reach it later.
        let first_listener = bind_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let first_port = first_listener.local_addr().unwrap().port();
        let first = register_with_rendezvous(addr, &[first_port], identity)
            .await
            .unwrap();
        assert_eq!(read_port_list(&first).await, vec![first_port]);

        let second = register_with_rendezvous(addr, &[7999], identity)
            .await
            .unwrap();
        assert_eq!(read_port_list(&second).await, vec![first_port, 7999]);

        let (dialled, _) = tokio::time::timeout(WAIT, first_listener.accept())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read_port_list(&dialled).await, vec![first_port, 7999]);

        shutdown.send(true).unwrap();
        task.await.unwrap().unwrap();
    }
}
