//! Per-message dispatch.
//!
//! A worker job calls [`process_readable`] on a connection it has claimed.
//! Exactly one frame is handled per call; if the frame is not complete yet
//! the job returns and the reader resumes on the next readiness event.
//!
//! ## Opcode Handling
//!
//! | Frame | Action |
//! |-------|--------|
//! | SEND_TRANSACTION | admit, broadcast if admitted, maybe start mining |
//! | SEND_BLOCK | search reply if it is the awaited height, else a new block |
//! | GET_BLOCK | reply with SEND_BLOCK, nothing if the height is unknown |
//! | GET_HASH | reply with the raw 32-byte hash, nothing if unknown |
//! | SEND_PORTS | hand to the membership task, then close the connection |
//! | raw hash | GET_HASH reply for the connection's session |

use std::sync::Arc;

use async_trait::async_trait;
use dc_05_reconciliation::{
    Acceptance, AncestorSearch, AncestorSource, ReconcileError, Request, Step, SyncState,
};
use shared_types::{encode_send_block, Block, Hash32, Message, Tag, Transaction};
use tracing::{debug, info, instrument, warn};

use crate::config::SyncMode;
use crate::context::NodeContext;
use crate::error::Result;
use crate::framing::{next_frame, Frame, FrameReader};
use crate::mining;
use crate::peers::Connection;
use crate::sessions::SearchSession;

/// What the job should do with the connection afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

pub async fn process_readable(ctx: &Arc<NodeContext>, conn: &Arc<Connection>) -> Result<Flow> {
    let Some(frame) = conn.poll_frame()? else {
        return Ok(Flow::Continue);
    };
    match frame {
        Frame::HashReply(hash) => {
            on_hash_reply(ctx, conn, hash);
            Ok(Flow::Continue)
        }
        Frame::Message(Message::SendBlock(block)) => {
            if let SyncState::AwaitingBlock { height } = conn.sync_state() {
                if block.height() == height {
                    on_block_reply(ctx, conn, block);
                    return Ok(Flow::Continue);
                }
            }
            on_new_block(ctx, conn, block).await;
            Ok(Flow::Continue)
        }
        Frame::Message(message) => Ok(handle_message(ctx, conn, message)),
    }
}

/// Everything except blocks and hash replies.
fn handle_message(ctx: &NodeContext, conn: &Connection, message: Message) -> Flow {
    match message {
        Message::SendTransaction(tx) => {
            on_transaction(ctx, tx);
            Flow::Continue
        }
        Message::GetBlock(height) => {
            match ctx.service().block_at(&height) {
                Some(block) => ctx.send(conn, &encode_send_block(&block)),
                None => debug!("[dc-05] GET_BLOCK {:?} from {}: unknown height", height, conn.peer()),
            }
            Flow::Continue
        }
        Message::GetHash(height) => {
            match ctx.service().hash_at(&height) {
                Some(hash) => ctx.send(conn, hash.as_bytes()),
                None => debug!("[dc-05] GET_HASH {:?} from {}: unknown height", height, conn.peer()),
            }
            Flow::Continue
        }
        Message::SendPorts(ports) => {
            info!("[dc-01] membership update from {}: {:?}", conn.peer(), ports);
            ctx.update_membership(ports);
            Flow::Close
        }
        Message::SendBlock(block) => {
            debug!(
                "[dc-05] dropping block {:?} from {} during inline search",
                block.height(),
                conn.peer()
            );
            Flow::Continue
        }
    }
}

fn on_transaction(ctx: &NodeContext, tx: Transaction) {
    match ctx.service().admit_transaction(tx) {
        Ok(admission) => {
            ctx.broadcast(&Message::SendTransaction(tx).encode());
            if admission.ready_to_mine {
                mining::maybe_start(ctx);
            }
        }
        Err(e) => debug!("[dc-04] transaction dropped: {}", e),
    }
}

#[instrument(skip_all, fields(peer = %conn.peer(), height = ?block.height()))]
async fn on_new_block(ctx: &Arc<NodeContext>, conn: &Arc<Connection>, block: Block) {
    let acceptance = match ctx.service().accept_new_block(block) {
        Ok(acceptance) => acceptance,
        Err(e) => {
            warn!("[dc-05] block from {} rejected: {}", conn.peer(), e);
            return;
        }
    };
    match acceptance {
        Acceptance::Applied(outcome) => mining::after_commit(ctx, &outcome),
        Acceptance::Search(search, request) => match ctx.config().sync.mode {
            SyncMode::EventDriven => begin_session(ctx, conn, search, request),
            SyncMode::Blocking => run_blocking_search(ctx, conn, search, request).await,
        },
        Acceptance::Propagate(txs) => {
            for tx in txs {
                ctx.broadcast(&Message::SendTransaction(tx).encode());
            }
        }
        Acceptance::Ignored(disposition) => {
            debug!("[dc-05] block ignored: {:?}", disposition)
        }
    }
}

// -------------------------------------------------------------------------
// Event-driven search
// -------------------------------------------------------------------------

fn request_frame(request: Request) -> Vec<u8> {
    match request {
        Request::GetHash(height) => Message::GetHash(height).encode(),
        Request::GetBlock(height) => Message::GetBlock(height).encode(),
    }
}

fn begin_session(ctx: &NodeContext, conn: &Connection, search: AncestorSearch, request: Request) {
    if let Some(old) = conn.begin_session(search) {
        info!(
            "[dc-05] newer block from {} replaces search toward {:?}",
            conn.peer(),
            old.search.target().height()
        );
    }
    ctx.send(conn, &request_frame(request));
}

fn on_hash_reply(ctx: &NodeContext, conn: &Connection, hash: Hash32) {
    let Some(mut session) = conn.take_session() else {
        debug!("[dc-05] hash reply from {} without a search", conn.peer());
        return;
    };
    let step = ctx.service().search_on_hash(&mut session.search, hash);
    continue_search(ctx, conn, session, step);
}

fn on_block_reply(ctx: &NodeContext, conn: &Connection, block: Block) {
    let Some(mut session) = conn.take_session() else {
        return;
    };
    let step = session.search.on_block(block);
    continue_search(ctx, conn, session, step);
}

fn continue_search(
    ctx: &NodeContext,
    conn: &Connection,
    session: SearchSession,
    step: std::result::Result<Step, ReconcileError>,
) {
    match step {
        Ok(Step::Send(request)) => {
            conn.resume_session(session);
            ctx.send(conn, &request_frame(request));
        }
        Ok(Step::Complete) => match ctx.service().commit_search(session.search.into_plan()) {
            Ok(outcome) => mining::after_commit(ctx, &outcome),
            Err(e) => warn!("[dc-05] merge with {} dropped: {}", conn.peer(), e),
        },
        Err(e) => warn!("[dc-05] search with {} abandoned: {}", conn.peer(), e),
    }
}

// -------------------------------------------------------------------------
// Blocking search
// -------------------------------------------------------------------------

async fn run_blocking_search(
    ctx: &Arc<NodeContext>,
    conn: &Arc<Connection>,
    search: AncestorSearch,
    request: Request,
) {
    let round_timeout = ctx.config().sync.round_timeout();
    let mut source = ConnectionSource::new(ctx, conn);
    let result = ctx
        .service()
        .drive_search(search, Step::Send(request), &mut source, round_timeout)
        .await;
    drop(source);
    match result {
        Ok(outcome) => mining::after_commit(ctx, &outcome),
        Err(e) => warn!("[dc-05] blocking search with {} failed: {}", conn.peer(), e),
    }
}

/// Answers search requests by talking to the peer on the connection the
/// block arrived on. Other frames that arrive in between are handled as
/// usual. The connection's reader is borrowed for the duration and put back
/// on drop.
struct ConnectionSource<'a> {
    ctx: &'a NodeContext,
    conn: &'a Connection,
    reader: Option<FrameReader>,
}

impl<'a> ConnectionSource<'a> {
    fn new(ctx: &'a NodeContext, conn: &'a Connection) -> Self {
        Self {
            ctx,
            conn,
            reader: Some(conn.take_reader()),
        }
    }

    async fn next(&mut self, awaiting_hash: bool) -> Result<Frame> {
        let stall = self.ctx.config().sync.round_timeout();
        let reader = self.reader.get_or_insert_with(|| self.conn.take_reader());
        next_frame(self.conn.stream(), reader, awaiting_hash, stall).await
    }

    async fn request(&mut self, request: Request) -> std::result::Result<(), ReconcileError> {
        self.conn
            .send_blocking(&request_frame(request))
            .await
            .map_err(|e| ReconcileError::PeerUnavailable(e.to_string()))
    }
}

impl Drop for ConnectionSource<'_> {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            self.conn.restore_reader(reader);
        }
    }
}

#[async_trait]
impl AncestorSource for ConnectionSource<'_> {
    async fn request_hash(&mut self, height: Tag) -> dc_05_reconciliation::Result<Hash32> {
        self.request(Request::GetHash(height)).await?;
        loop {
            match self.next(true).await {
                Ok(Frame::HashReply(hash)) => return Ok(hash),
                Ok(Frame::Message(message)) => {
                    handle_message(self.ctx, self.conn, message);
                }
                Err(e) => return Err(ReconcileError::PeerUnavailable(e.to_string())),
            }
        }
    }

    async fn request_block(&mut self, height: Tag) -> dc_05_reconciliation::Result<Block> {
        self.request(Request::GetBlock(height)).await?;
        loop {
            match self.next(false).await {
                Ok(Frame::Message(Message::SendBlock(block))) if block.height() == height => {
                    return Ok(block)
                }
                Ok(Frame::Message(message)) => {
                    handle_message(self.ctx, self.conn, message);
                }
                Ok(Frame::HashReply(_)) => {}
                Err(e) => return Err(ReconcileError::PeerUnavailable(e.to_string())),
            }
        }
    }
}
