//! Independent recomputation of an assembled block's totals.
//!
//! The assembler maintains running totals incrementally; this module
//! refolds weight, sigops and fee from the block's own transaction set so
//! any drift between the incremental bookkeeping and ground truth surfaces
//! as an invalid verdict rather than being silently carried forward.

use std::collections::HashMap;

use tracing::debug;

use crate::block::Block;
use crate::constants::{COINBASE_SIGOPS, COINBASE_WEIGHT};
use crate::error::CheckError;

/// Totals recomputed from scratch by [`check_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckedTotals {
    pub weight: u64,
    pub fee: u64,
    pub sigops_cost: u64,
}

/// Refold a block's totals and verify the global limits and dependency
/// ordering.
///
/// Every included transaction must have each of its `depends` included at
/// an earlier position in the block. The verdict is informational: the
/// block is never mutated or corrected.
pub fn check_block(
    block: &Block,
    weight_limit: u64,
    sigops_limit: u64,
) -> Result<CheckedTotals, CheckError> {
    let mut weight = COINBASE_WEIGHT;
    let mut sigops = COINBASE_SIGOPS;
    let mut fee: u64 = 0;

    let positions: HashMap<&str, usize> = block
        .txids()
        .enumerate()
        .map(|(pos, txid)| (txid.as_str(), pos))
        .collect();

    for (txid, entry) in block.entries() {
        weight += entry.weight;
        sigops += entry.sigops_cost;
        fee += entry.base_fee;

        let Some(&own) = positions.get(txid.as_str()) else { continue };
        for dep in &entry.depends {
            match positions.get(dep.as_str()) {
                Some(&pos) if pos < own => {}
                _ => {
                    return Err(CheckError::MissingDependency {
                        owner: txid.clone(),
                        missing: dep.clone(),
                    });
                }
            }
        }
    }

    if weight > weight_limit {
        return Err(CheckError::ExcessWeight { got: weight, limit: weight_limit });
    }
    if sigops > sigops_limit {
        return Err(CheckError::ExcessSigops { got: sigops, limit: sigops_limit });
    }

    debug!(height = block.height, weight, sigops, fee, "block passed recheck");
    Ok(CheckedTotals { weight, fee, sigops_cost: sigops })
}
