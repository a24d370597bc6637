//! Outbound (Driven) ports for the Reconciliation subsystem.

use async_trait::async_trait;
use shared_types::{Block, Hash32, Tag};

use crate::domain::Result;

/// A peer that can answer ancestor-search requests synchronously.
///
/// Used by the blocking sync driver. Implementations send the request and
/// wait for the reply on the same connection; the driver bounds each call
/// with the round timeout.
#[async_trait]
pub trait AncestorSource: Send {
    async fn request_hash(&mut self, height: Tag) -> Result<Hash32>;

    async fn request_block(&mut self, height: Tag) -> Result<Block>;
}
