//! Worker node assembly.
//!
//! ## Startup Sequence
//!
//! 1. Bind one listener per port (bind failures are fatal)
//! 2. Register every port with the rendezvous service in one write
//! 3. Build the node context (chain, ledger, mempool, peers)
//! 4. Spawn the worker pool and the membership task
//! 5. Run the event loop until shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use dc_01_peer_io::{bind_listener, PeerIoError};
use shared_types::identity_from_seed;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::bootstrap::register_with_rendezvous;
use crate::config::NodeConfig;
use crate::context::NodeContext;
use crate::error::{Result, RuntimeError};
use crate::event_loop::EventLoop;
use crate::membership;
use crate::worker_pool::WorkerPool;

/// Whether startup registers with the rendezvous service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    Rendezvous,
    /// Peers are supplied with [`WorkerNode::connect_peers`].
    Manual,
}

pub struct WorkerNode {
    ctx: Arc<NodeContext>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<()>>,
}

impl WorkerNode {
    /// Bind `ports` and start the node. Port 0 binds an ephemeral port;
    /// [`WorkerNode::local_ports`] reports what was bound.
    pub async fn start(config: NodeConfig, ports: &[u16], discovery: Discovery) -> Result<Self> {
        config.validate()?;

        let mut listeners = Vec::with_capacity(ports.len());
        for &port in ports {
            let listener = bind_listener(
                config.network.peer_addr(port),
                config.network.listen_backlog,
            )?;
            let bound = listener.local_addr().map_err(PeerIoError::from)?.port();
            listeners.push((bound, listener));
        }
        let local_ports: Vec<u16> = listeners.iter().map(|(port, _)| *port).collect();
        let identity = identity_from_seed(&config.identity_seed);

        let bootstrap = match discovery {
            Discovery::Rendezvous => Some(
                register_with_rendezvous(config.network.bootstrap_addr, &local_ports, identity)
                    .await?,
            ),
            Discovery::Manual => None,
        };

        info!(
            "Starting worker node: ports {:?}, {} tx/block, difficulty {}, identity {}",
            local_ports,
            config.chain.transactions_per_block,
            config.chain.difficulty,
            identity
        );

        let cores = config.workers.cores;
        let (ctx, channels) = NodeContext::new(config, identity, local_ports);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let pool = WorkerPool::spawn(ctx.clone(), cores);
        let membership = tokio::spawn(membership::run(
            ctx.clone(),
            channels.membership_rx,
            shutdown_rx.clone(),
        ));
        let event_loop = EventLoop {
            ctx: ctx.clone(),
            listeners,
            bootstrap,
            pool,
            miner_rx: channels.miner_rx,
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(async move {
            let result = event_loop.run().await;
            membership.abort();
            result
        });

        Ok(Self {
            ctx,
            shutdown: shutdown_tx,
            task,
        })
    }

    pub fn context(&self) -> &Arc<NodeContext> {
        &self.ctx
    }

    pub fn local_ports(&self) -> &[u16] {
        self.ctx.local_ports()
    }

    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.local_ports()
            .iter()
            .map(|&port| self.ctx.config().network.peer_addr(port))
            .collect()
    }

    /// Dial peers directly, as a membership update would.
    pub async fn connect_peers(&self, ports: &[u16]) -> usize {
        membership::connect_all(&self.ctx, ports).await
    }

    /// Signal shutdown and wait for the event loop to finish.
    pub async fn shutdown(self) -> Result<()> {
        // The loop may already have exited, in which case nobody listens.
        let _ = self.shutdown.send(true);
        self.task
            .await
            .map_err(|e| RuntimeError::Task(e.to_string()))?
    }
}
