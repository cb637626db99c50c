//! Candidate and historical block records.
//!
//! A [`Block`] is either a template being grown by the assembler, a
//! template reported by the node, or a record of an already-mined block.
//! Included transactions keep their insertion order (parents land before
//! children), which is what lets the checker verify dependency ordering
//! after the fact.

use std::collections::HashMap;

use tracing::debug;

use crate::constants::{COINBASE_SIGOPS, COINBASE_WEIGHT};
use crate::mempool::{MempoolEntry, Txid};
use crate::reward;

/// One candidate transaction from a node-supplied block template.
///
/// Node templates carry per-transaction figures but not the full mempool
/// record; the records stay in the pool the template was derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateTx {
    pub txid: Txid,
    pub weight: u64,
    pub sigops: u64,
}

/// A block template under construction, or a finalized block record.
///
/// `weight` and `sigops_cost` start at the coinbase reservation; `size`
/// (vsize units) and `fee` (sats) start at zero. Once assembly finishes the
/// block is treated as immutable.
#[derive(Debug, Clone)]
pub struct Block {
    pub height: u64,
    pub version: i32,
    pub prev_hash: String,
    pub weight: u64,
    pub size: u64,
    pub fee: u64,
    pub sigops_cost: u64,
    order: Vec<Txid>,
    txs: HashMap<Txid, MempoolEntry>,
}

impl Block {
    /// Empty template with the coinbase reservation applied.
    pub fn template(height: u64, version: i32, prev_hash: impl Into<String>) -> Self {
        Self {
            height,
            version,
            prev_hash: prev_hash.into(),
            weight: COINBASE_WEIGHT,
            size: 0,
            fee: 0,
            sigops_cost: COINBASE_SIGOPS,
            order: Vec::new(),
            txs: HashMap::new(),
        }
    }

    /// Block record seeded from a node-supplied template snapshot.
    ///
    /// The node reports the coinbase payout rather than a fee total, so the
    /// fee is recovered as `coinbase_value - subsidy(height)`. Weight and
    /// sigops totals are summed from the per-candidate figures on top of the
    /// coinbase reservation.
    pub fn from_template(
        height: u64,
        version: i32,
        prev_hash: impl Into<String>,
        coinbase_value: u64,
        candidates: &[TemplateTx],
    ) -> Self {
        let mut block = Self::template(height, version, prev_hash);
        block.fee = coinbase_value.saturating_sub(reward::subsidy(height));
        for tx in candidates {
            block.weight += tx.weight;
            block.sigops_cost += tx.sigops;
            block.order.push(tx.txid.clone());
        }
        block
    }

    /// Record of an already-mined block: totals only, no transaction list.
    ///
    /// `fee` comes from the node's per-height fee totals; the sigops cost of
    /// a historical block is not reported and stays zero.
    pub fn mined(
        height: u64,
        version: i32,
        prev_hash: impl Into<String>,
        weight: u64,
        size: u64,
        fee: u64,
    ) -> Self {
        Self {
            height,
            version,
            prev_hash: prev_hash.into(),
            weight,
            size,
            fee,
            sigops_cost: 0,
            order: Vec::new(),
            txs: HashMap::new(),
        }
    }

    /// Append a transaction, adding its intrinsic costs to the running
    /// totals. Already-included ids are skipped.
    ///
    /// Callers are responsible for inserting parents first; the checker
    /// verifies that ordering independently.
    pub(crate) fn add(&mut self, txid: Txid, entry: MempoolEntry) {
        if self.contains(&txid) {
            debug!(%txid, height = self.height, "already in block, skipping");
            return;
        }
        self.fee += entry.base_fee;
        self.weight += entry.weight;
        self.size += entry.vsize;
        self.sigops_cost += entry.sigops_cost;
        debug!(%txid, height = self.height, "added transaction to block");
        self.order.push(txid.clone());
        self.txs.insert(txid, entry);
    }

    pub fn contains(&self, txid: &str) -> bool {
        if self.txs.contains_key(txid) {
            return true;
        }
        // Assembled blocks keep `txs` and `order` in lockstep; only
        // node-template records (ids without entries) need the list scan.
        self.txs.len() != self.order.len() && self.order.iter().any(|id| id == txid)
    }

    pub fn get(&self, txid: &str) -> Option<&MempoolEntry> {
        self.txs.get(txid)
    }

    /// Included txids in inclusion order.
    pub fn txids(&self) -> impl Iterator<Item = &Txid> {
        self.order.iter()
    }

    /// Included transactions with their records, in inclusion order.
    ///
    /// Node-template and mined records carry no per-transaction entries, so
    /// this is empty for those.
    pub fn entries(&self) -> impl Iterator<Item = (&Txid, &MempoolEntry)> {
        self.order.iter().filter_map(|id| self.txs.get(id).map(|e| (id, e)))
    }

    /// Number of included transactions (excluding the coinbase).
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Newly issued currency for this block's height.
    pub fn subsidy(&self) -> u64 {
        reward::subsidy(self.height)
    }

    /// Total miner income: subsidy plus included fees.
    pub fn reward(&self) -> u64 {
        self.subsidy() + self.fee
    }
}
