//! Membership task: dials peers announced by the rendezvous service.

use std::sync::Arc;

use dc_01_peer_io::connect;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::context::NodeContext;
use crate::peers::Direction;

/// Consume peer lists until shutdown. Updates are handled one at a time so
/// two lists never race to dial the same port.
pub async fn run(
    ctx: Arc<NodeContext>,
    mut updates: UnboundedReceiver<Vec<u16>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            update = updates.recv() => match update {
                Some(ports) => {
                    connect_all(&ctx, &ports).await;
                }
                None => break,
            },
        }
    }
    debug!("membership task stopped");
}

/// Dial every listed port that is neither ours nor already dialled.
/// Failures are logged and skipped. Returns the number of new connections.
pub async fn connect_all(ctx: &NodeContext, ports: &[u16]) -> usize {
    let mut connected = 0;
    for &port in ports {
        if ctx.is_local_port(port) || ctx.peers().has_outbound(port) {
            continue;
        }
        let addr = ctx.config().network.peer_addr(port);
        match connect(addr).await {
            Ok(stream) => {
                ctx.register(stream, addr, Direction::Outbound { remote_port: port });
                connected += 1;
            }
            Err(e) => warn!("[dc-01] skipping peer {}: {}", addr, e),
        }
    }
    info!(
        "Membership update: {} new peers, {} outbound in total",
        connected,
        ctx.peers().outbound().len()
    );
    connected
}
