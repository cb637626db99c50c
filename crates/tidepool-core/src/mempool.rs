//! In-memory pool of unconfirmed, dependency-linked transactions.
//!
//! The pool is a point-in-time snapshot from a node and only ever shrinks:
//! removing a transaction subtracts its intrinsic cost from every
//! descendant's ancestor-package aggregates, so package fee rates stay
//! correct as successive blocks are carved out of the same pool. New
//! arrivals are out of scope; clone the pool to fork independent futures
//! from one snapshot.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, error, info, warn};

use crate::block::Block;
use crate::error::ConsistencyError;

/// Transaction identifier as reported by the node (opaque hex string).
pub type Txid = String;

/// Fee rate precision multiplier.
///
/// Package fee rate is stored as `ancestor_fees * FEE_RATE_PRECISION /
/// ancestor_size`, giving milli-sats per virtual byte for fine-grained
/// ordering without floats.
const FEE_RATE_PRECISION: u128 = 1_000;

/// A single pool entry: intrinsic costs plus ancestor-package aggregates.
///
/// Ancestor aggregates cover the transitive closure of unconfirmed parents
/// *including the entry itself*: the "package" of child-pays-for-parent
/// fee estimation. All numeric fields are plain totals; a field the node
/// did not report is zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MempoolEntry {
    /// Fee of this transaction alone, in sats.
    pub base_fee: u64,
    /// Virtual size in vbytes.
    pub vsize: u64,
    /// Weight in weight units.
    pub weight: u64,
    /// Signature-operation cost of this transaction alone.
    pub sigops_cost: u64,
    /// Number of in-pool ancestors, including self.
    pub ancestor_count: u64,
    /// Total vsize of the ancestor package.
    pub ancestor_size: u64,
    /// Total fees of the ancestor package, in sats.
    pub ancestor_fees: u64,
    /// Total sigops cost of the ancestor package.
    pub ancestor_sigops: u64,
    /// Direct in-pool parents that must be confirmed first.
    pub depends: BTreeSet<Txid>,
    /// Direct in-pool children; inverse of `depends`.
    pub spentby: BTreeSet<Txid>,
}

impl MempoolEntry {
    /// Package fee rate in milli-sats per vbyte, the sole ranking key for
    /// block assembly.
    ///
    /// Uses a u128 intermediate so large packages cannot overflow.
    pub fn fee_rate(&self) -> u64 {
        if self.ancestor_size == 0 {
            return u64::MAX;
        }
        let rate =
            (self.ancestor_fees as u128) * FEE_RATE_PRECISION / (self.ancestor_size as u128);
        rate.min(u64::MAX as u128) as u64
    }
}

/// In-memory pool of unconfirmed transactions, keyed by txid.
///
/// Constructed once from a node snapshot, mutated in place by removals,
/// never grown. Aggregate queries fold over the live entries on every call
/// rather than caching, so they always reflect the current pool state.
///
/// Not thread-safe — callers serialize access.
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    entries: HashMap<Txid, MempoolEntry>,
}

impl FromIterator<(Txid, MempoolEntry)> for Mempool {
    fn from_iter<I: IntoIterator<Item = (Txid, MempoolEntry)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

impl Mempool {
    /// Confirm that every `depends` and `spentby` reference resolves to an
    /// entry in the pool.
    ///
    /// A failed check means the snapshot is not self-consistent (a block
    /// likely arrived while it was being collected); the caller must not
    /// build from it.
    pub fn validate(&self) -> Result<(), ConsistencyError> {
        for (txid, entry) in &self.entries {
            for dep in &entry.depends {
                if !self.entries.contains_key(dep) {
                    error!(owner = %txid, missing = %dep, "dangling depends reference");
                    return Err(ConsistencyError::MissingDepends {
                        owner: txid.clone(),
                        missing: dep.clone(),
                    });
                }
            }
            for child in &entry.spentby {
                if !self.entries.contains_key(child) {
                    error!(owner = %txid, missing = %child, "dangling spentby reference");
                    return Err(ConsistencyError::MissingSpentBy {
                        owner: txid.clone(),
                        missing: child.clone(),
                    });
                }
            }
        }
        debug!(transactions = self.entries.len(), "mempool snapshot is consistent");
        Ok(())
    }

    /// Remove a transaction, propagating its cost out of all descendants.
    ///
    /// Returns the removed entry. An id not in the pool is a warned no-op
    /// returning `None`; removing twice is always safe.
    pub fn remove(&mut self, txid: &str) -> Option<MempoolEntry> {
        if !self.entries.contains_key(txid) {
            warn!(%txid, "not removed from mempool: not found");
            return None;
        }
        self.update_descendants(txid);
        let entry = self.entries.remove(txid);
        debug!(%txid, "removed from mempool and updated descendants");
        entry
    }

    /// Subtract `txid`'s intrinsic fee/size/sigops from every descendant's
    /// ancestor aggregates, and sever the edge in its direct children.
    ///
    /// Each direct and transitive descendant is visited exactly once, so
    /// aggregates drop by exactly one transaction's worth even in
    /// diamond-shaped graphs. Only direct children carry `txid` in
    /// `depends`, so only they have the edge severed.
    fn update_descendants(&mut self, txid: &str) {
        let Some(removed) = self.entries.get(txid) else { return };
        let (fee, size, sigops) = (removed.base_fee, removed.vsize, removed.sigops_cost);
        let direct: Vec<Txid> = removed.spentby.iter().cloned().collect();

        for child in &direct {
            if let Some(entry) = self.entries.get_mut(child) {
                entry.depends.remove(txid);
                debug!(%txid, %child, "severed depends edge");
            }
        }

        // Work-list walk instead of call-stack recursion: descendant chains
        // can be arbitrarily deep. Ids already gone from the pool are
        // skipped, which makes out-of-order block removal harmless.
        let mut stack = direct;
        let mut visited: HashSet<Txid> = HashSet::new();
        while let Some(id) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            let Some(entry) = self.entries.get_mut(&id) else { continue };
            entry.ancestor_count = entry.ancestor_count.saturating_sub(1);
            entry.ancestor_size = entry.ancestor_size.saturating_sub(size);
            entry.ancestor_fees = entry.ancestor_fees.saturating_sub(fee);
            entry.ancestor_sigops = entry.ancestor_sigops.saturating_sub(sigops);
            stack.extend(entry.spentby.iter().cloned());
        }
    }

    /// Remove every transaction listed in `block`, in inclusion order.
    ///
    /// Ids absent from the pool are tolerated (already removed or never
    /// present). Returns the number actually removed. This is how the pool
    /// advances from "before this block" to "ready for the next".
    pub fn remove_block(&mut self, block: &Block) -> usize {
        let mut removed = 0;
        for txid in block.txids() {
            if self.remove(txid).is_some() {
                removed += 1;
            }
        }
        info!(
            removed,
            remaining = self.entries.len(),
            height = block.height,
            "mempool advanced past block"
        );
        removed
    }

    pub fn get(&self, txid: &str) -> Option<&MempoolEntry> {
        self.entries.get(txid)
    }

    pub fn contains(&self, txid: &str) -> bool {
        self.entries.contains_key(txid)
    }

    /// Iterate over all entries (arbitrary order).
    pub fn iter(&self) -> impl Iterator<Item = (&Txid, &MempoolEntry)> {
        self.entries.iter()
    }

    /// Number of transactions in the pool.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total fees of all transactions in the pool, in sats.
    pub fn total_fees(&self) -> u64 {
        self.entries.values().map(|e| e.base_fee).sum()
    }

    /// Total weight of all transactions in the pool.
    pub fn total_weight(&self) -> u64 {
        self.entries.values().map(|e| e.weight).sum()
    }

    /// Total virtual size of all transactions in the pool.
    pub fn total_vsize(&self) -> u64 {
        self.entries.values().map(|e| e.vsize).sum()
    }

    /// Total sigops cost of all transactions in the pool.
    pub fn total_sigops(&self) -> u64 {
        self.entries.values().map(|e| e.sigops_cost).sum()
    }
}
