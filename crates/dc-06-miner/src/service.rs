//! Miner thread lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::domain::{search_nonce, BlockTemplate, MinedBlock, MinerError, PowOutcome};

/// What a miner thread reports back to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinerEvent {
    Mined(MinedBlock),
    /// No nonce satisfied the difficulty; the batch should be returned.
    Exhausted { batch_id: u64 },
}

impl MinerEvent {
    pub fn batch_id(&self) -> u64 {
        match self {
            Self::Mined(mined) => mined.batch_id,
            Self::Exhausted { batch_id } => *batch_id,
        }
    }
}

/// Owner's side of a running miner. Dropping it cancels the search.
#[derive(Debug)]
pub struct MinerHandle {
    batch_id: u64,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl MinerHandle {
    pub fn batch_id(&self) -> u64 {
        self.batch_id
    }

    /// Ask the thread to stop. It exits before its next nonce attempt and
    /// sends nothing.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Cancel and wait for the thread to exit.
    pub fn stop(mut self) {
        self.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("[dc-06] miner thread for batch {} panicked", self.batch_id);
            }
        }
    }
}

impl Drop for MinerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Mine `template` on a dedicated thread named `dc-miner-<batch_id>`.
pub fn spawn_miner(
    batch_id: u64,
    template: BlockTemplate,
    difficulty: usize,
    results: UnboundedSender<MinerEvent>,
) -> Result<MinerHandle, MinerError> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let height = template.height();

    let thread = std::thread::Builder::new()
        .name(format!("dc-miner-{batch_id}"))
        .spawn(move || {
            let event = match search_nonce(template, difficulty, &flag) {
                PowOutcome::Found(block) => {
                    info!("[dc-06] mined block {:?} for batch {}", block.hash(), batch_id);
                    MinerEvent::Mined(MinedBlock { batch_id, block })
                }
                PowOutcome::Exhausted => MinerEvent::Exhausted { batch_id },
                PowOutcome::Cancelled => return,
            };
            if results.send(event).is_err() {
                debug!("[dc-06] result receiver closed, dropping batch {}", batch_id);
            }
        })?;

    debug!(
        "[dc-06] miner started for batch {} at {:?} (difficulty {})",
        batch_id, height, difficulty
    );
    Ok(MinerHandle {
        batch_id,
        cancel,
        thread: Some(thread),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::test_utils::{demo_address, make_tx};
    use shared_types::{genesis_prior_hash, Tag};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn template() -> BlockTemplate {
        BlockTemplate::new(
            genesis_prior_hash(),
            Tag::zero(),
            demo_address(1),
            vec![make_tx(1, 2, 3, 4)],
        )
    }

    #[tokio::test]
    async fn test_miner_delivers_block() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_miner(7, template(), 1, tx).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.batch_id(), 7);
        match event {
            MinerEvent::Mined(mined) => {
                assert_eq!(mined.block.height(), Tag::zero());
                assert_eq!(mined.block.recompute_hash(), mined.block.hash());
            }
            other => panic!("unexpected {other:?}"),
        }
        handle.stop();
    }

    #[tokio::test]
    async fn test_cancelled_miner_sends_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // 64 trailing zeros is unreachable, so only cancellation ends this.
        let handle = spawn_miner(3, template(), 64, tx).unwrap();
        assert_eq!(handle.batch_id(), 3);
        handle.stop();

        // The sender was moved into the thread, which has exited.
        assert!(rx.recv().await.is_none());
    }
}
