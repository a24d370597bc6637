//! # Worker Event Loop
//!
//! One loop per node multiplexes everything the node waits on:
//!
//! ```text
//!                    ┌─────────────────────────────────────────┐
//!  listeners ───────→│                                         │──→ register connection
//!  peer sockets ────→│  interest recomputed every iteration    │──→ writable: flush
//!                    │  from the readiness book                │──→ readable: claim + submit job
//!  bootstrap socket →│                                         │──→ SEND_PORTS → membership task
//!  miner channel ───→│             tokio::select!              │──→ apply / discard mined block
//!  wake notify ─────→│                                         │──→ recompute interest
//!  sweep tick ──────→│                                         │──→ abandon stale sessions
//!  shutdown ────────→└─────────────────────────────────────────┘──→ exit
//! ```
//!
//! A socket is read-interesting unless a job owns it and write-interesting
//! while it has queued output. Jobs wake the loop when they release a
//! socket or queue output, so the next iteration sees the change.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use dc_01_peer_io::PeerIoError;
use dc_06_miner::MinerEvent;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::io::Ready;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::context::NodeContext;
use crate::error::{Result, RuntimeError};
use crate::framing::{Frame, FrameReader};
use crate::mining;
use crate::peers::{Connection, Direction};
use crate::sessions;
use crate::worker_pool::WorkerPool;

pub struct EventLoop {
    pub ctx: Arc<NodeContext>,
    /// `(local port, listener)` for every `-ports` entry.
    pub listeners: Vec<(u16, TcpListener)>,
    /// Registration socket; the rendezvous service sends peer lists here.
    pub bootstrap: Option<TcpStream>,
    pub pool: WorkerPool,
    pub miner_rx: UnboundedReceiver<MinerEvent>,
    pub shutdown: watch::Receiver<bool>,
}

enum Event {
    Shutdown,
    Ready(Arc<Connection>, io::Result<Ready>),
    Accepted(io::Result<(TcpStream, SocketAddr, u16)>),
    Bootstrap(Result<Frame>),
    Mined(MinerEvent),
    Woken,
    Sweep,
}

impl EventLoop {
    pub async fn run(self) -> Result<()> {
        let EventLoop {
            ctx,
            listeners,
            mut bootstrap,
            pool,
            mut miner_rx,
            mut shutdown,
        } = self;

        let mut boot_reader = FrameReader::new(ctx.config().chain.transactions_per_block);
        let mut sweep = tokio::time::interval(ctx.config().sync.sweep_interval());
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "Event loop running on ports {:?} ({} sync)",
            ctx.local_ports(),
            ctx.config().sync.mode
        );

        loop {
            let event = {
                let mut ready: FuturesUnordered<_> = ctx
                    .readiness()
                    .interests(ctx.peers().ids())
                    .into_iter()
                    .filter_map(|(id, interest)| ctx.peers().get(id).map(|c| (c, interest)))
                    .map(|(conn, interest)| async move {
                        let ready = conn.stream().ready(interest).await;
                        (conn, ready)
                    })
                    .collect();

                tokio::select! {
                    _ = shutdown.changed() => Event::Shutdown,
                    Some((conn, ready)) = ready.next(), if !ready.is_empty() => Event::Ready(conn, ready),
                    accepted = accept_any(&listeners) => Event::Accepted(accepted),
                    frame = read_bootstrap(bootstrap.as_ref(), &mut boot_reader) => Event::Bootstrap(frame),
                    Some(mined) = miner_rx.recv() => Event::Mined(mined),
                    _ = ctx.woken() => Event::Woken,
                    _ = sweep.tick() => Event::Sweep,
                }
            };

            match event {
                Event::Shutdown => break,
                Event::Ready(conn, ready) => on_ready(&ctx, &pool, conn, ready),
                Event::Accepted(Ok((stream, peer, local_port))) => {
                    ctx.register(stream, peer, Direction::Accepted { local_port });
                }
                Event::Accepted(Err(e)) => warn!("[dc-01] accept failed: {}", e),
                Event::Bootstrap(Ok(Frame::Message(shared_types::Message::SendPorts(ports)))) => {
                    info!("Peer list from rendezvous: {:?}", ports);
                    ctx.update_membership(ports);
                }
                Event::Bootstrap(Ok(other)) => {
                    warn!("Unexpected frame from rendezvous: {:?}", other);
                }
                Event::Bootstrap(Err(RuntimeError::PeerIo(PeerIoError::Closed))) => {
                    debug!("Rendezvous closed the registration socket");
                    bootstrap = None;
                }
                Event::Bootstrap(Err(e)) => {
                    warn!("Dropping rendezvous socket: {}", e);
                    bootstrap = None;
                }
                Event::Mined(event) => mining::on_miner_event(&ctx, event),
                Event::Woken => {}
                Event::Sweep => {
                    let report = sessions::sweep(&ctx, Instant::now());
                    if report != sessions::SweepReport::default() {
                        debug!("Sweep: {:?}", report);
                    }
                }
            }
        }

        info!("Event loop shutting down");
        mining::stop(&ctx);
        pool.shutdown().await;
        Ok(())
    }
}

fn on_ready(ctx: &NodeContext, pool: &WorkerPool, conn: Arc<Connection>, ready: io::Result<Ready>) {
    let ready = match ready {
        Ok(ready) => ready,
        Err(e) => {
            warn!("[dc-01] readiness error on {}: {}", conn.peer(), e);
            ctx.close(conn.id());
            return;
        }
    };
    if ready.is_writable() && ctx.readiness().has_pending_write(conn.id()) {
        ctx.flush(&conn);
    }
    if (ready.is_readable() || ready.is_read_closed()) && ctx.readiness().try_claim(conn.id()) {
        let id = conn.id();
        if !pool.submit(conn) {
            ctx.readiness().release(id);
        }
    }
}

async fn accept_any(listeners: &[(u16, TcpListener)]) -> io::Result<(TcpStream, SocketAddr, u16)> {
    if listeners.is_empty() {
        return std::future::pending().await;
    }
    let accepts = listeners.iter().map(|(port, listener)| {
        Box::pin(async move {
            let (stream, peer) = listener.accept().await?;
            Ok::<_, io::Error>((stream, peer, *port))
        })
    });
    let (accepted, _, _) = futures::future::select_all(accepts).await;
    accepted
}

/// Next frame from the rendezvous socket. The reader keeps partial frames
/// across cancellations, so this is safe inside `select!`.
async fn read_bootstrap(stream: Option<&TcpStream>, reader: &mut FrameReader) -> Result<Frame> {
    let Some(stream) = stream else {
        return std::future::pending().await;
    };
    loop {
        stream.readable().await.map_err(PeerIoError::from)?;
        if let Some(frame) = reader.poll(stream, false)? {
            return Ok(frame);
        }
    }
}
