//! Incoming-block classification against the current tip.
//!
//! ```text
//!   chain empty ──height 0──────────────────────────→ Genesis
//!        │      └─height > 0─────────────────────────→ DeepMerge
//!        ↓
//!   same hash already at that height ────────────────→ Duplicate
//!   height = tip+1, prior = tip hash ────────────────→ Extend
//!   height = tip, incoming hash wins tie-break
//!        ├─ prior = tip prior ───────────────────────→ Replace
//!        └─ prior ≠ tip prior ───────────────────────→ DeepMerge
//!   height = tip, incoming hash loses ───────────────→ KeepLocal
//!   height > tip (gap, or tip+1 on a foreign prior) ─→ DeepMerge
//!   height < tip ────────────────────────────────────→ PropagateOnly
//! ```
//!
//! Equal-height forks are decided by the smaller block hash so that every
//! node picks the same side regardless of arrival order.

use dc_02_chain_store::ChainReader;
use shared_types::Block;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Genesis,
    Extend,
    Replace,
    DeepMerge,
    PropagateOnly,
    Duplicate,
    KeepLocal,
}

pub fn classify<C: ChainReader + ?Sized>(chain: &C, incoming: &Block) -> Disposition {
    let height = incoming.height();
    let Some(tip) = chain.tip() else {
        return if height.is_zero() {
            Disposition::Genesis
        } else {
            Disposition::DeepMerge
        };
    };

    if chain.hash_at(&height) == Some(incoming.hash()) {
        return Disposition::Duplicate;
    }

    let tip_height = tip.height();
    if height > tip_height {
        if height == tip_height.increment() && incoming.prior_hash() == tip.hash() {
            Disposition::Extend
        } else {
            Disposition::DeepMerge
        }
    } else if height == tip_height {
        if incoming.hash() >= tip.hash() {
            Disposition::KeepLocal
        } else if incoming.prior_hash() == tip.prior_hash() {
            Disposition::Replace
        } else {
            Disposition::DeepMerge
        }
    } else {
        Disposition::PropagateOnly
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dc_02_chain_store::ChainStore;
    use shared_types::test_utils::{build_chain, extend_chain, seal_block};
    use shared_types::{Hash32, Tag};
    use std::sync::Arc;

    fn store(blocks: &[Block]) -> ChainStore {
        let mut store = ChainStore::new();
        for b in blocks {
            store.push(Arc::new(b.clone())).unwrap();
        }
        store
    }

    /// A sibling of `tip` with the same prior, forced to win or lose.
    fn sibling(tip: &Block, smaller: bool) -> Block {
        let mut miner = 0u8;
        loop {
            let candidate = seal_block(
                tip.prior_hash(),
                tip.height(),
                Hash32([miner; 32]),
                tip.transactions.clone(),
                0,
            );
            if (candidate.hash() < tip.hash()) == smaller {
                return candidate;
            }
            miner += 1;
        }
    }

    #[test]
    fn test_empty_chain() {
        let chain = build_chain(2, 1, 0);
        let empty = ChainStore::new();
        assert_eq!(classify(&empty, &chain[0]), Disposition::Genesis);
        assert_eq!(classify(&empty, &chain[1]), Disposition::DeepMerge);
    }

    #[test]
    fn test_extend_and_duplicate() {
        let chain = build_chain(3, 1, 0);
        let local = store(&chain[..2]);
        assert_eq!(classify(&local, &chain[2]), Disposition::Extend);
        assert_eq!(classify(&local, &chain[1]), Disposition::Duplicate);
        assert_eq!(classify(&local, &chain[0]), Disposition::Duplicate);
    }

    #[test]
    fn test_lower_height_propagates() {
        let ours = build_chain(4, 1, 0);
        let theirs = build_chain(2, 1, 9);
        let local = store(&ours);
        assert_eq!(classify(&local, &theirs[1]), Disposition::PropagateOnly);
    }

    #[test]
    fn test_gap_and_foreign_prior_deep_merge() {
        let ours = build_chain(3, 1, 0);
        let local = store(&ours);
        let longer = extend_chain(&ours, 2, 1, 0);
        assert_eq!(classify(&local, &longer[4]), Disposition::DeepMerge);

        let foreign = build_chain(4, 1, 5);
        assert_eq!(classify(&local, &foreign[3]), Disposition::DeepMerge);
    }

    #[test]
    fn test_equal_height_sibling_tie_break() {
        let ours = build_chain(3, 1, 0);
        let local = store(&ours);
        let winner = sibling(&ours[2], true);
        let loser = sibling(&ours[2], false);
        assert_eq!(classify(&local, &winner), Disposition::Replace);
        assert_eq!(classify(&local, &loser), Disposition::KeepLocal);
    }

    #[test]
    fn test_equal_height_divergent_prior() {
        let ours = build_chain(3, 1, 0);
        let local = store(&ours);
        let theirs = build_chain(3, 1, 4);
        let expected = if theirs[2].hash() < ours[2].hash() {
            Disposition::DeepMerge
        } else {
            Disposition::KeepLocal
        };
        assert_eq!(classify(&local, &theirs[2]), expected);
        assert_eq!(theirs[2].height(), Tag::from_u64(2));
    }
}
