//! Consistent snapshot collection from the node.

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use tidepool_core::block::Block;
use tidepool_core::mempool::Mempool;
use tidepool_core::traits::NodeClient;

/// Collection rounds tolerated before giving up on a quiet snapshot.
const MAX_ROUNDS: u32 = 5;

/// Fetch a coherent (tip, mempool, template) triple.
///
/// A block arriving mid-collection leaves the mempool and template
/// describing different chain states. The tip height is read before and
/// after the collection; if it moved, or the snapshot fails validation,
/// the whole round is retried. The returned tip record has its fee filled
/// in from the node's per-height totals.
pub async fn fetch_synced(client: &dyn NodeClient) -> Result<(Block, Mempool, Block)> {
    for round in 1..=MAX_ROUNDS {
        let tip_height = client.tip_height().await?;
        let tip_hash = client.tip_hash().await?;

        let mempool = client.fetch_mempool().await?;
        debug!(transactions = mempool.len(), "got mempool snapshot");
        let template = client.fetch_template().await?;
        debug!(transactions = template.len(), "got block template");

        if client.tip_height().await? != tip_height {
            warn!(round, "block found during snapshot collection, retrying");
            continue;
        }
        if let Err(err) = mempool.validate() {
            warn!(round, %err, "inconsistent mempool snapshot, retrying");
            continue;
        }

        let mut tip = client.fetch_block(&tip_hash).await?;
        tip.fee = client.fetch_block_fee(tip_height).await?;
        info!(height = tip_height, transactions = mempool.len(), "snapshot collected");
        return Ok((tip, mempool, template));
    }
    bail!("no consistent snapshot after {MAX_ROUNDS} rounds")
}
