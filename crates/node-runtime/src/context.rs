//! Node context shared by the event loop, worker jobs and background tasks.
//!
//! Everything a worker node mutates lives here behind declared locks:
//!
//! | Resource | Guard |
//! |----------|-------|
//! | chain | `ReconciliationService` RwLock (taken first) |
//! | ledger + mempool | `ReconciliationService` Mutex |
//! | connections | `PeerTable` RwLock, plus per-connection locks |
//! | readiness bookkeeping | `ReadinessBook` Mutex |
//! | running miner | `miner` Mutex, never held while calling the service |

use std::net::SocketAddr;
use std::sync::Arc;

use dc_01_peer_io::{ReadinessBook, WriteOutcome};
use dc_03_ledger::Ledger;
use dc_04_mempool::TransactionPool;
use dc_05_reconciliation::ReconciliationService;
use dc_06_miner::{MinerEvent, MinerHandle};
use parking_lot::Mutex;
use shared_types::Address;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::peers::{ConnId, Connection, Direction, PeerTable};

/// Receiving ends handed to the tasks that own them.
pub struct NodeChannels {
    pub miner_rx: UnboundedReceiver<MinerEvent>,
    pub membership_rx: UnboundedReceiver<Vec<u16>>,
}

pub struct NodeContext {
    config: NodeConfig,
    identity: Address,
    service: ReconciliationService,
    peers: PeerTable,
    readiness: ReadinessBook<ConnId>,
    local_ports: Vec<u16>,
    miner: Mutex<Option<MinerHandle>>,
    miner_tx: UnboundedSender<MinerEvent>,
    membership_tx: UnboundedSender<Vec<u16>>,
    wake: Notify,
}

impl NodeContext {
    pub fn new(
        config: NodeConfig,
        identity: Address,
        local_ports: Vec<u16>,
    ) -> (Arc<Self>, NodeChannels) {
        let service = ReconciliationService::new(
            config.chain_params(),
            Ledger::with_demo_accounts(config.ledger.demo_accounts, config.initial_balance()),
            TransactionPool::new(config.mempool_config()),
        );
        let (miner_tx, miner_rx) = mpsc::unbounded_channel();
        let (membership_tx, membership_rx) = mpsc::unbounded_channel();
        let ctx = Arc::new(Self {
            config,
            identity,
            service,
            peers: PeerTable::new(),
            readiness: ReadinessBook::new(),
            local_ports,
            miner: Mutex::new(None),
            miner_tx,
            membership_tx,
            wake: Notify::new(),
        });
        (
            ctx,
            NodeChannels {
                miner_rx,
                membership_rx,
            },
        )
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Miner address and registration identity.
    pub fn identity(&self) -> Address {
        self.identity
    }

    pub fn service(&self) -> &ReconciliationService {
        &self.service
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    pub fn readiness(&self) -> &ReadinessBook<ConnId> {
        &self.readiness
    }

    pub fn local_ports(&self) -> &[u16] {
        &self.local_ports
    }

    pub fn is_local_port(&self, port: u16) -> bool {
        self.local_ports.contains(&port)
    }

    pub(crate) fn miner_slot(&self) -> &Mutex<Option<MinerHandle>> {
        &self.miner
    }

    pub(crate) fn miner_sender(&self) -> UnboundedSender<MinerEvent> {
        self.miner_tx.clone()
    }

    // ---------------------------------------------------------------------
    // Event loop signalling
    // ---------------------------------------------------------------------

    /// Ask the event loop to recompute socket interest.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    pub async fn woken(&self) {
        self.wake.notified().await
    }

    /// Queue a peer list for the membership task.
    pub fn update_membership(&self, ports: Vec<u16>) {
        if self.membership_tx.send(ports).is_err() {
            debug!("membership task gone, dropping update");
        }
    }

    // ---------------------------------------------------------------------
    // Connections
    // ---------------------------------------------------------------------

    pub fn register(&self, stream: TcpStream, peer: SocketAddr, direction: Direction) -> Arc<Connection> {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("[dc-01] nodelay on {}: {}", peer, e);
        }
        let conn = self
            .peers
            .insert(stream, peer, direction, self.config.chain.transactions_per_block);
        info!("[dc-01] connection {} with {} ({:?})", conn.id(), peer, direction);
        self.wake();
        conn
    }

    /// Forget a connection. The socket closes once the last job holding it
    /// finishes.
    pub fn close(&self, id: ConnId) {
        if let Some(conn) = self.peers.remove(id) {
            self.readiness.forget(id);
            info!("[dc-01] closed connection {} with {}", id, conn.peer());
            self.wake();
        }
    }

    /// Send without blocking. Bytes that would block wait for writability.
    pub fn send(&self, conn: &Connection, bytes: &[u8]) {
        match conn.send(bytes, &self.readiness) {
            Ok(WriteOutcome::Flushed) => {}
            Ok(WriteOutcome::Queued { pending }) => {
                debug!("[dc-01] {} bytes queued for {}", pending, conn.peer());
                self.wake();
            }
            Err(e) => {
                warn!("[dc-01] send to {} failed: {}", conn.peer(), e);
                self.close(conn.id());
            }
        }
    }

    /// Retry queued bytes after the socket reported writable.
    pub fn flush(&self, conn: &Connection) {
        match conn.flush(&self.readiness) {
            Ok(WriteOutcome::Flushed | WriteOutcome::Queued { .. }) => {}
            Err(e) => {
                warn!("[dc-01] flush to {} failed: {}", conn.peer(), e);
                self.close(conn.id());
            }
        }
    }

    /// Send to every outbound peer. Returns how many were sent to.
    pub fn broadcast(&self, bytes: &[u8]) -> usize {
        let targets = self.peers.outbound();
        for conn in &targets {
            self.send(conn, bytes);
        }
        targets.len()
    }
}
