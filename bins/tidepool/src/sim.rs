//! Successive-block simulation over one shrinking pool.

use std::time::Instant;

use tracing::{info, warn};

use tidepool_core::block::Block;
use tidepool_core::block_check::check_block;
use tidepool_core::builder::{assemble, Budgets};
use tidepool_core::mempool::Mempool;

/// Parent reference for a block whose predecessor has not been mined yet.
const UNKNOWN_PARENT: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Simulate `count` blocks beyond `template`, advancing `pool` past each.
///
/// The node's template is the first block carved out of the snapshot; each
/// simulated successor removes its predecessor's transactions from the pool
/// and re-assembles at the next height. Every assembled block goes through
/// the independent recheck; a failed verdict is reported, not fatal.
pub fn simulate(
    pool: &mut Mempool,
    template: &Block,
    count: usize,
    budgets: &Budgets,
) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::with_capacity(count);

    for _ in 0..count {
        let prev = blocks.last().unwrap_or(template);
        let height = prev.height + 1;
        let version = prev.version;
        pool.remove_block(prev);

        info!(
            height,
            transactions = pool.len(),
            fees = pool.total_fees(),
            vsize = pool.total_vsize(),
            "assembling from remaining pool"
        );

        let started = Instant::now();
        let block = assemble(pool, height, version, UNKNOWN_PARENT, budgets);
        info!(
            height,
            transactions = block.len(),
            fee = block.fee,
            weight = block.weight,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "assembled simulated block"
        );

        if let Err(err) = check_block(&block, budgets.weight_limit, budgets.sigops_limit) {
            warn!(height, %err, "simulated block failed recheck");
        }

        blocks.push(block);
    }

    blocks
}
