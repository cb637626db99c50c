//! The injected node-client capability.
//!
//! The core never talks to a node directly: collaborators hand it snapshots
//! through this interface, which keeps the whole pipeline testable with
//! synthetic pools. The simulator binary implements it over JSON-RPC.

use async_trait::async_trait;

use crate::block::Block;
use crate::error::NodeError;
use crate::mempool::Mempool;

/// Read-only access to the external node.
///
/// A snapshot pair (mempool + template) is only coherent if the chain tip
/// did not move while it was collected; callers compare
/// [`tip_height`](Self::tip_height) before and after and retry on movement.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Current chain tip height.
    async fn tip_height(&self) -> Result<u64, NodeError>;

    /// Hash of the current tip block.
    async fn tip_hash(&self) -> Result<String, NodeError>;

    /// Full verbose mempool snapshot.
    async fn fetch_mempool(&self) -> Result<Mempool, NodeError>;

    /// The node's own candidate template for the next block.
    async fn fetch_template(&self) -> Result<Block, NodeError>;

    /// Record of an already-mined block (totals only), by hash.
    async fn fetch_block(&self, hash: &str) -> Result<Block, NodeError>;

    /// Total fees of the mined block at `height`, in sats.
    async fn fetch_block_fee(&self, height: u64) -> Result<u64, NodeError>;
}
