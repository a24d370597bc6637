//! Worker pool draining the readable-connection queue.
//!
//! The event loop claims a connection in the readiness book and submits it;
//! one worker processes a single message from it, releases the claim and
//! wakes the loop so the connection is watched again. A connection is never
//! in two jobs at once, which keeps its messages in arrival order.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::context::NodeContext;
use crate::dispatch::{process_readable, Flow};
use crate::error::RuntimeError;
use crate::peers::Connection;

type JobQueue = Arc<tokio::sync::Mutex<UnboundedReceiver<Arc<Connection>>>>;

pub struct WorkerPool {
    jobs: UnboundedSender<Arc<Connection>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `cores` workers (at least one).
    pub fn spawn(ctx: Arc<NodeContext>, cores: usize) -> Self {
        let (jobs, rx) = mpsc::unbounded_channel();
        let queue: JobQueue = Arc::new(tokio::sync::Mutex::new(rx));
        let workers = (0..cores.max(1))
            .map(|index| tokio::spawn(worker_loop(index, ctx.clone(), queue.clone())))
            .collect::<Vec<_>>();
        info!("Worker pool started with {} workers", workers.len());
        Self { jobs, workers }
    }

    /// Queue a claimed connection. False if the pool has shut down.
    pub fn submit(&self, conn: Arc<Connection>) -> bool {
        self.jobs.send(conn).is_ok()
    }

    /// Stop taking jobs and wait for running ones to finish.
    pub async fn shutdown(self) {
        drop(self.jobs);
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!("worker task ended abnormally: {}", e);
            }
        }
    }
}

async fn worker_loop(index: usize, ctx: Arc<NodeContext>, queue: JobQueue) {
    loop {
        let next = { queue.lock().await.recv().await };
        let Some(conn) = next else {
            break;
        };
        run_job(&ctx, conn).await;
    }
    debug!("worker {} stopped", index);
}

async fn run_job(ctx: &Arc<NodeContext>, conn: Arc<Connection>) {
    let id = conn.id();
    match process_readable(ctx, &conn).await {
        Ok(Flow::Continue) => {}
        Ok(Flow::Close) => ctx.close(id),
        Err(RuntimeError::PeerIo(dc_01_peer_io::PeerIoError::Closed)) => {
            debug!("[dc-01] {} closed the connection", conn.peer());
            ctx.close(id);
        }
        Err(e) if e.closes_connection() => {
            warn!("[dc-01] dropping {}: {}", conn.peer(), e);
            ctx.close(id);
        }
        Err(e) => warn!("[dc-01] error on {}: {}", conn.peer(), e),
    }
    ctx.readiness().release(id);
    ctx.wake();
}
