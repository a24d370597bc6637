//! Miner controller: starts, preempts and collects mining attempts.
//!
//! ```text
//! admit / settle ──maybe_start──→ prepare_mining ──→ spawn_miner (thread)
//!                                                          │
//!  chain change ──after_commit──→ cancel preempted batch   │ MinerEvent
//!                                                          ↓
//!  event loop ──on_miner_event──→ apply_mined_block ──→ broadcast SEND_BLOCK
//! ```

use dc_05_reconciliation::{CommitOutcome, MinedOutcome};
use dc_06_miner::{spawn_miner, BlockTemplate, MinedBlock, MinerEvent};
use shared_types::encode_send_block;
use tracing::{debug, error, info, warn};

use crate::context::NodeContext;

/// Start mining if the pool holds a full block and nothing is in flight.
pub fn maybe_start(ctx: &NodeContext) -> bool {
    let Some(job) = ctx.service().prepare_mining() else {
        return false;
    };
    let batch_id = job.batch.id;
    let template = BlockTemplate::new(job.prior_hash, job.height, ctx.identity(), job.batch.transactions);
    match spawn_miner(
        batch_id,
        template,
        ctx.config().chain.difficulty,
        ctx.miner_sender(),
    ) {
        Ok(handle) => {
            if let Some(previous) = ctx.miner_slot().lock().replace(handle) {
                previous.cancel();
            }
            info!("[dc-06] mining batch {} at {:?}", batch_id, job.height);
            true
        }
        Err(e) => {
            error!("[dc-06] could not start miner: {}", e);
            ctx.service().return_batch(batch_id);
            false
        }
    }
}

/// Stop the miner working on `batch_id`, if it is the running one.
pub fn cancel(ctx: &NodeContext, batch_id: u64) {
    let mut slot = ctx.miner_slot().lock();
    if slot.as_ref().map(|h| h.batch_id()) == Some(batch_id) {
        if let Some(handle) = slot.take() {
            handle.cancel();
            debug!("[dc-06] cancelled miner for batch {}", batch_id);
        }
    }
}

/// Stop whatever is running and wait for its thread, on shutdown.
pub fn stop(ctx: &NodeContext) {
    let running = ctx.miner_slot().lock().take();
    if let Some(handle) = running {
        let batch_id = handle.batch_id();
        handle.stop();
        ctx.service().return_batch(batch_id);
    }
}

/// Follow-up after any chain change: a preempted batch's miner is stopped
/// (its transactions are already back in the active pool) and mining
/// restarts on the new tip if possible.
pub fn after_commit(ctx: &NodeContext, outcome: &CommitOutcome) {
    if let Some(batch_id) = outcome.preempted_batch {
        cancel(ctx, batch_id);
    }
    maybe_start(ctx);
}

pub fn on_miner_event(ctx: &NodeContext, event: MinerEvent) {
    let batch_id = event.batch_id();
    {
        let mut slot = ctx.miner_slot().lock();
        if slot.as_ref().map(|h| h.batch_id()) == Some(batch_id) {
            slot.take();
        }
    }

    match event {
        MinerEvent::Mined(MinedBlock { batch_id, block }) => {
            match ctx.service().apply_mined_block(batch_id, block) {
                Ok(MinedOutcome::Applied(block)) => {
                    let peers = ctx.broadcast(&encode_send_block(&block));
                    info!(
                        "[dc-06] block {:?} at {:?} sent to {} peers",
                        block.hash(),
                        block.height(),
                        peers
                    );
                }
                Ok(MinedOutcome::Discarded) => {}
                Err(e) => warn!("[dc-06] mined block rejected: {}", e),
            }
            maybe_start(ctx);
        }
        MinerEvent::Exhausted { batch_id } => {
            warn!("[dc-06] batch {} exhausted the nonce space", batch_id);
            ctx.service().return_batch(batch_id);
        }
    }
}
