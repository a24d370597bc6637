//! Block stack plus height index.

use std::collections::HashMap;

use shared_types::{Hash32, SharedBlock, Tag};
use tracing::debug;

use super::errors::ChainError;
use crate::ports::ChainReader;

/// The canonical chain. Only a top is kept; there are no forward links.
#[derive(Debug, Default)]
pub struct ChainStore {
    blocks: Vec<SharedBlock>,
    by_height: HashMap<Tag, SharedBlock>,
}

impl ChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Height the next pushed block must carry.
    pub fn next_height(&self) -> Tag {
        self.tip()
            .map(|b| b.height().increment())
            .unwrap_or_else(Tag::zero)
    }

    /// Extend the chain by one block.
    pub fn push(&mut self, block: SharedBlock) -> Result<(), ChainError> {
        let expected = self.next_height();
        if block.height() != expected {
            return Err(ChainError::HeightGap {
                expected,
                actual: block.height(),
            });
        }
        if let Some(tip) = self.tip() {
            if block.prior_hash() != tip.hash() {
                return Err(ChainError::PriorMismatch {
                    height: block.height(),
                    expected: tip.hash(),
                    actual: block.prior_hash(),
                });
            }
        }
        debug!("[dc-02] push height={:?} hash={:?}", block.height(), block.hash());
        self.by_height.insert(block.height(), block.clone());
        self.blocks.push(block);
        Ok(())
    }

    /// Remove and return the tip.
    pub fn pop(&mut self) -> Option<SharedBlock> {
        let block = self.blocks.pop()?;
        self.by_height.remove(&block.height());
        debug!("[dc-02] pop height={:?}", block.height());
        Some(block)
    }

    /// Blocks strictly above `height`, oldest first.
    pub fn blocks_above(&self, height: &Tag) -> &[SharedBlock] {
        let start = self
            .blocks
            .iter()
            .position(|b| b.height() > *height)
            .unwrap_or(self.blocks.len());
        &self.blocks[start..]
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedBlock> {
        self.blocks.iter()
    }

    /// Hash of every block, oldest first. Used to compare histories.
    pub fn hashes(&self) -> Vec<Hash32> {
        self.blocks.iter().map(|b| b.hash()).collect()
    }
}

impl ChainReader for ChainStore {
    fn tip(&self) -> Option<&SharedBlock> {
        self.blocks.last()
    }

    fn block_at(&self, height: &Tag) -> Option<&SharedBlock> {
        self.by_height.get(height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::test_utils::build_chain;
    use std::sync::Arc;

    fn store_with(len: u64) -> (ChainStore, Vec<SharedBlock>) {
        let blocks: Vec<SharedBlock> = build_chain(len, 1, 0).into_iter().map(Arc::new).collect();
        let mut store = ChainStore::new();
        for b in &blocks {
            store.push(b.clone()).unwrap();
        }
        (store, blocks)
    }

    #[test]
    fn test_push_tracks_tip_and_index() {
        let (store, blocks) = store_with(3);
        assert_eq!(store.len(), 3);
        assert_eq!(store.tip_height(), Some(Tag::from_u64(2)));
        assert_eq!(store.tip_hash(), Some(blocks[2].hash()));
        assert_eq!(store.hash_at(&Tag::from_u64(1)), Some(blocks[1].hash()));
        assert!(store.block_at(&Tag::from_u64(3)).is_none());
    }

    #[test]
    fn test_empty_chain_requires_height_zero() {
        let blocks = build_chain(2, 1, 0);
        let mut store = ChainStore::new();
        let err = store.push(Arc::new(blocks[1].clone())).unwrap_err();
        assert_eq!(
            err,
            ChainError::HeightGap {
                expected: Tag::zero(),
                actual: Tag::from_u64(1)
            }
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_push_rejects_foreign_prior() {
        let (mut store, _) = store_with(2);
        let other = build_chain(3, 1, 7);
        let err = store.push(Arc::new(other[2].clone())).unwrap_err();
        assert!(matches!(err, ChainError::PriorMismatch { .. }));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_pop_removes_index_entry() {
        let (mut store, blocks) = store_with(3);
        let popped = store.pop().unwrap();
        assert_eq!(popped.hash(), blocks[2].hash());
        assert!(store.block_at(&Tag::from_u64(2)).is_none());
        assert_eq!(store.tip_hash(), Some(blocks[1].hash()));

        // Top and index agree after re-push.
        store.push(popped).unwrap();
        assert_eq!(store.tip().map(|b| b.hash()), store.hash_at(&Tag::from_u64(2)));
    }

    #[test]
    fn test_pop_empty_is_none() {
        assert!(ChainStore::new().pop().is_none());
    }

    #[test]
    fn test_blocks_above() {
        let (store, blocks) = store_with(4);
        let above: Vec<Hash32> = store
            .blocks_above(&Tag::from_u64(1))
            .iter()
            .map(|b| b.hash())
            .collect();
        assert_eq!(above, vec![blocks[2].hash(), blocks[3].hash()]);
        assert!(store.blocks_above(&Tag::from_u64(3)).is_empty());
    }
}
