use shared_types::Block;

/// A solved block, tagged with the mempool batch it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedBlock {
    pub batch_id: u64,
    pub block: Block,
}
