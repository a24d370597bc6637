//! Proof-of-work nonce search.

use std::sync::atomic::{AtomicBool, Ordering};

use shared_types::{meets_difficulty, Block, Tag};
use tracing::{debug, warn};

use super::template::BlockTemplate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowOutcome {
    Found(Block),
    /// The cancel flag was raised before a nonce was found.
    Cancelled,
    /// Every nonce up to all-nines failed.
    Exhausted,
}

/// Try nonces upward from zero, as digit tags, until the hash has
/// `difficulty` trailing zero hex digits.
///
/// `cancel` is checked before every attempt.
pub fn search_nonce(template: BlockTemplate, difficulty: usize, cancel: &AtomicBool) -> PowOutcome {
    let mut nonce = Tag::zero();
    let mut attempts: u64 = 0;
    loop {
        if cancel.load(Ordering::Relaxed) {
            debug!("[dc-06] cancelled after {} attempts", attempts);
            return PowOutcome::Cancelled;
        }
        let hash = template.hash_with(&nonce);
        attempts += 1;
        if meets_difficulty(&hash, difficulty) {
            debug!("[dc-06] nonce found after {} attempts", attempts);
            return PowOutcome::Found(template.seal(nonce, hash));
        }
        if nonce.is_max() {
            warn!("[dc-06] nonce space exhausted at {:?}", template.height());
            return PowOutcome::Exhausted;
        }
        nonce = nonce.increment();
    }
}
