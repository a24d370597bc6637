//! # Ancestor Search
//!
//! Walks backward from the local tip asking the peer for its hash at each
//! height until the two chains agree, then walks forward fetching the
//! peer's blocks up to the one that triggered the search.
//!
//! ```text
//!                 ┌──────── mismatch, height-1 ────────┐
//!                 ↓                                    │
//! [READY] ──→ [AWAITING_HASH h] ──────hash reply───────┤
//!                 │                                    │ match
//!                 │ mismatch at 0 / empty chain        ↓
//!                 └──────────────→ [AWAITING_BLOCK h] ←┘
//!                                     │   ↑
//!                                     │   └─ block reply, h+1
//!                                     ↓
//!                        h reaches the triggering height → Complete
//! ```
//!
//! The search never touches the chain. It only records the common ancestor
//! and the fetched blocks; the service rewrites the chain in one step when
//! the search completes, and refuses if the tip moved in the meantime. A
//! search that fails or is abandoned therefore leaves the chain exactly as
//! it was.

use std::sync::Arc;

use dc_02_chain_store::{ChainReader, ChainStore};
use shared_types::{genesis_prior_hash, Block, Hash32, SharedBlock, Tag};
use tracing::debug;

use super::entities::ChainParams;
use super::errors::{ReconcileError, Result};
use super::validation::validate_block;

/// Per-connection reconciliation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Ready,
    AwaitingHash { height: Tag },
    AwaitingBlock { height: Tag },
}

impl SyncState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::AwaitingHash { .. } => "AWAITING_HASH",
            Self::AwaitingBlock { .. } => "AWAITING_BLOCK",
        }
    }
}

/// A request the driver must send to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    GetHash(Tag),
    GetBlock(Tag),
}

/// What the driver does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Send(Request),
    /// All blocks gathered; hand the search to `commit_search`.
    Complete,
}

/// Everything needed to rewrite the chain once the search has finished.
#[derive(Debug, Clone)]
pub struct MergePlan {
    /// Tip hash when the search began; commit aborts if it changed.
    pub base_tip: Option<Hash32>,
    /// Highest height both chains share, `None` when nothing is shared.
    pub ancestor: Option<Tag>,
    /// Peer blocks above the ancestor, oldest first, ending with the trigger.
    pub added: Vec<SharedBlock>,
}

#[derive(Debug)]
pub struct AncestorSearch {
    params: ChainParams,
    target: SharedBlock,
    base_tip: Option<Hash32>,
    state: SyncState,
    ancestor: Option<(Tag, Hash32)>,
    added: Vec<SharedBlock>,
}

impl AncestorSearch {
    /// Start searching for the common ancestor of the local chain and the
    /// chain ending in `target`.
    ///
    /// The peer's hash at `target.height - 1` is already known (it is the
    /// target's prior-hash), so that height is compared locally without a
    /// round trip.
    pub fn begin(
        chain: &ChainStore,
        target: SharedBlock,
        params: ChainParams,
    ) -> Result<(Self, Step)> {
        let mut search = Self {
            params,
            target,
            base_tip: chain.tip_hash(),
            state: SyncState::Ready,
            ancestor: None,
            added: Vec::new(),
        };

        let target_height = search.target.height();
        let mut candidate = match chain.tip_height() {
            Some(tip) if !target_height.is_zero() => Some(tip.min(target_height.decrement())),
            _ => None,
        };

        if let Some(height) = candidate {
            if height == target_height.decrement() {
                match chain.hash_at(&height) {
                    Some(hash) if hash == search.target.prior_hash() => {
                        let step = search.found(height, hash)?;
                        return Ok((search, step));
                    }
                    _ => candidate = step_down(height),
                }
            }
        }

        let step = match candidate {
            Some(height) => {
                search.state = SyncState::AwaitingHash { height };
                Step::Send(Request::GetHash(height))
            }
            None => search.fetch_from(Tag::zero())?,
        };
        debug!(
            "[dc-05] ancestor search for {:?}: {:?}",
            search.target.height(),
            step
        );
        Ok((search, step))
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn target(&self) -> &SharedBlock {
        &self.target
    }

    /// Handle a GET_HASH reply.
    pub fn on_hash(&mut self, chain: &ChainStore, hash: Hash32) -> Result<Step> {
        let SyncState::AwaitingHash { height } = self.state else {
            return Err(ReconcileError::UnexpectedReply {
                state: self.state.name(),
            });
        };
        if chain.tip_hash() != self.base_tip {
            return Err(ReconcileError::TipMoved);
        }
        if chain.hash_at(&height) == Some(hash) {
            return self.found(height, hash);
        }
        debug!("[dc-05] hash mismatch at {:?}", height);
        match step_down(height) {
            Some(lower) => {
                self.state = SyncState::AwaitingHash { height: lower };
                Ok(Step::Send(Request::GetHash(lower)))
            }
            None => {
                self.ancestor = None;
                self.fetch_from(Tag::zero())
            }
        }
    }

    /// Handle a GET_BLOCK reply.
    pub fn on_block(&mut self, block: Block) -> Result<Step> {
        let SyncState::AwaitingBlock { height } = self.state else {
            return Err(ReconcileError::UnexpectedReply {
                state: self.state.name(),
            });
        };
        if block.height() != height {
            return Err(ReconcileError::UnexpectedHeight {
                expected: height,
                actual: block.height(),
            });
        }
        validate_block(&block, &self.params)?;
        if block.prior_hash() != self.expected_prior() {
            return Err(ReconcileError::BrokenLinkage { height });
        }
        self.added.push(Arc::new(block));
        self.fetch_from(height.increment())
    }

    /// Consume a completed search.
    pub fn into_plan(self) -> MergePlan {
        MergePlan {
            base_tip: self.base_tip,
            ancestor: self.ancestor.map(|(h, _)| h),
            added: self.added,
        }
    }

    fn found(&mut self, height: Tag, hash: Hash32) -> Result<Step> {
        debug!("[dc-05] common ancestor at {:?}", height);
        self.ancestor = Some((height, hash));
        self.fetch_from(height.increment())
    }

    /// Prior-hash the next block must carry.
    fn expected_prior(&self) -> Hash32 {
        match (self.added.last(), self.ancestor) {
            (Some(last), _) => last.hash(),
            (None, Some((_, hash))) => hash,
            (None, None) => genesis_prior_hash(),
        }
    }

    /// Request `height`, or finish once the next height is the target's.
    fn fetch_from(&mut self, height: Tag) -> Result<Step> {
        if height < self.target.height() {
            self.state = SyncState::AwaitingBlock { height };
            return Ok(Step::Send(Request::GetBlock(height)));
        }
        // The peer's chain moved under us if the fetched run does not lead
        // to the block that started the search.
        if self.target.prior_hash() != self.expected_prior() {
            return Err(ReconcileError::BrokenLinkage {
                height: self.target.height(),
            });
        }
        self.added.push(self.target.clone());
        self.state = SyncState::Ready;
        Ok(Step::Complete)
    }
}

fn step_down(height: Tag) -> Option<Tag> {
    (!height.is_zero()).then(|| height.decrement())
}
