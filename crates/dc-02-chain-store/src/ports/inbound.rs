//! Inbound (Driving) ports for the Chain Store subsystem.

use shared_types::{Hash32, SharedBlock, Tag};

/// Read-only chain queries used by peer request handlers and classification.
pub trait ChainReader {
    fn tip(&self) -> Option<&SharedBlock>;

    fn block_at(&self, height: &Tag) -> Option<&SharedBlock>;

    fn tip_height(&self) -> Option<Tag> {
        self.tip().map(|b| b.height())
    }

    fn tip_hash(&self) -> Option<Hash32> {
        self.tip().map(|b| b.hash())
    }

    /// Hash of the block at `height`, if this node has one.
    fn hash_at(&self, height: &Tag) -> Option<Hash32> {
        self.block_at(height).map(|b| b.hash())
    }
}
