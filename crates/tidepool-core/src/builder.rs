//! Greedy block assembly from a mempool under weight and sigops budgets.
//!
//! Candidates are ranked once by descending package fee rate and the ranked
//! list is consumed in a single pass; the ranking is not refreshed as chains
//! are absorbed into the block. That keeps assembly at one sort plus one
//! scan per block and trades away fee optimality: a chosen approximation,
//! not an oversight.

use std::collections::HashSet;

use tracing::debug;

use crate::block::Block;
use crate::constants::{
    DEFAULT_MAX_ATTEMPTS, MAX_BLOCK_SIGOPS_COST, MAX_BLOCK_WEIGHT, MIN_TRANSACTION_WEIGHT,
    WITNESS_SCALE_FACTOR,
};
use crate::mempool::{Mempool, Txid};

/// Resource budgets and scan bounds for a single assembly run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Budgets {
    /// Global block weight limit.
    pub weight_limit: u64,
    /// Global block sigops limit.
    pub sigops_limit: u64,
    /// Weight of the smallest standard transaction; once remaining space
    /// drops below this the scan stops outright.
    pub min_tx_weight: u64,
    /// Failed-fit skips tolerated before giving up on the scan: a time
    /// bound for large pools, not a correctness requirement.
    pub max_attempts: u32,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            weight_limit: MAX_BLOCK_WEIGHT,
            sigops_limit: MAX_BLOCK_SIGOPS_COST,
            min_tx_weight: MIN_TRANSACTION_WEIGHT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Rank all pool txids by descending package fee rate.
///
/// Ties break on ascending txid so identical pools always yield identical
/// blocks.
fn ranked_txids(mempool: &Mempool) -> Vec<Txid> {
    let mut ranked: Vec<(u64, Txid)> = mempool
        .iter()
        .map(|(txid, entry)| (entry.fee_rate(), txid.clone()))
        .collect();
    ranked.sort_unstable_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    ranked.into_iter().map(|(_, txid)| txid).collect()
}

/// Assemble a candidate block from the pool.
///
/// Walks the ranked list once. Already-included ids are skipped without
/// penalty; a candidate whose ancestor package would blow a budget counts
/// as a failed attempt; the scan ends when the remaining weight cannot fit
/// a standard transaction or failed attempts reach
/// [`max_attempts`](Budgets::max_attempts). Selected candidates are
/// inserted with their full ancestor chain, parents first, each adding only
/// its intrinsic costs so already-included ancestors are never counted
/// twice.
pub fn assemble(
    mempool: &Mempool,
    height: u64,
    version: i32,
    prev_hash: &str,
    budgets: &Budgets,
) -> Block {
    let mut block = Block::template(height, version, prev_hash);
    let mut attempts: u32 = 0;

    for txid in ranked_txids(mempool) {
        if block.contains(&txid) {
            debug!(%txid, "already in block, skipping");
            continue;
        }
        if block.weight >= budgets.weight_limit.saturating_sub(budgets.min_tx_weight) {
            debug!(weight = block.weight, "no standard transaction can fit, stopping");
            break;
        }
        let Some(entry) = mempool.get(&txid) else { continue };

        // The package estimate deliberately includes ancestors that may
        // already be in the block, making it a conservative overestimate.
        let package_weight = entry.ancestor_size * WITNESS_SCALE_FACTOR;
        if block.weight + package_weight > budgets.weight_limit
            || block.sigops_cost + entry.ancestor_sigops > budgets.sigops_limit
        {
            attempts += 1;
            debug!(%txid, package_weight, attempts, "package does not fit, skipping");
            if attempts >= budgets.max_attempts {
                debug!(attempts, "attempt budget exhausted, stopping");
                break;
            }
            continue;
        }

        add_chain(&mut block, mempool, &txid);
    }

    debug!(
        height,
        transactions = block.len(),
        weight = block.weight,
        fee = block.fee,
        sigops = block.sigops_cost,
        "assembled block template"
    );
    block
}

/// Insert `txid` and its not-yet-included ancestor chain, parents first.
///
/// Depth-first with an explicit stack: each id is pushed once for expansion
/// and once for insertion, so every parent lands before any transaction
/// that depends on it. Ids missing from the pool (or already included) are
/// skipped.
fn add_chain(block: &mut Block, mempool: &Mempool, txid: &str) {
    let mut queued: HashSet<Txid> = HashSet::from([txid.to_owned()]);
    let mut stack: Vec<(Txid, bool)> = vec![(txid.to_owned(), false)];

    while let Some((id, expanded)) = stack.pop() {
        if block.contains(&id) {
            continue;
        }
        let Some(entry) = mempool.get(&id) else { continue };
        if expanded {
            block.add(id, entry.clone());
            continue;
        }
        stack.push((id.clone(), true));
        // Reverse so the lexically-first parent is expanded first.
        for dep in entry.depends.iter().rev() {
            if queued.insert(dep.clone()) {
                stack.push((dep.clone(), false));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_check::check_block;
    use crate::constants::{COINBASE_SIGOPS, COINBASE_WEIGHT};
    use crate::mempool::test_support::make_pool;
    use proptest::prelude::*;

    const NO_DEPS: &[&str] = &[];

    fn wide_open() -> Budgets {
        Budgets::default()
    }

    fn included(block: &Block) -> Vec<&str> {
        block.txids().map(|s| s.as_str()).collect()
    }

    // ------------------------------------------------------------------
    // Empty pool
    // ------------------------------------------------------------------

    #[test]
    fn empty_pool_yields_coinbase_only_template() {
        let block = assemble(&Mempool::default(), 100, 1, "aa", &wide_open());
        assert!(block.is_empty());
        assert_eq!(block.weight, COINBASE_WEIGHT);
        assert_eq!(block.sigops_cost, COINBASE_SIGOPS);
        assert_eq!(block.fee, 0);
    }

    // ------------------------------------------------------------------
    // Ordering and chains
    // ------------------------------------------------------------------

    #[test]
    fn selects_by_descending_package_fee_rate() {
        let pool = make_pool(&[
            ("low", 1_000, 100, 0, NO_DEPS),
            ("high", 10_000, 100, 0, NO_DEPS),
            ("mid", 5_000, 100, 0, NO_DEPS),
        ]);
        let block = assemble(&pool, 100, 1, "aa", &wide_open());
        assert_eq!(included(&block), vec!["high", "mid", "low"]);
    }

    #[test]
    fn ties_break_on_txid_for_determinism() {
        let pool = make_pool(&[
            ("b", 1_000, 100, 0, NO_DEPS),
            ("a", 1_000, 100, 0, NO_DEPS),
            ("c", 1_000, 100, 0, NO_DEPS),
        ]);
        let block = assemble(&pool, 100, 1, "aa", &wide_open());
        assert_eq!(included(&block), vec!["a", "b", "c"]);
    }

    #[test]
    fn parent_inserted_before_child() {
        // The child's package rate outranks the parent alone, so the child
        // is scanned first and must pull the parent in ahead of itself.
        let pool = make_pool(&[
            ("parent", 1_000, 100, 0, NO_DEPS),
            ("child", 20_000, 100, 0, &["parent"]),
        ]);
        let block = assemble(&pool, 100, 1, "aa", &wide_open());
        assert_eq!(included(&block), vec!["parent", "child"]);
        assert_eq!(block.fee, 21_000);
    }

    #[test]
    fn grandparent_chain_in_dependency_order() {
        let pool = make_pool(&[
            ("a", 100, 100, 0, NO_DEPS),
            ("b", 200, 100, 0, &["a"]),
            ("c", 90_000, 100, 0, &["b"]),
        ]);
        let block = assemble(&pool, 100, 1, "aa", &wide_open());
        assert_eq!(included(&block), vec!["a", "b", "c"]);
    }

    #[test]
    fn diamond_ancestors_inserted_once() {
        let pool = make_pool(&[
            ("a", 100, 100, 0, NO_DEPS),
            ("b", 200, 100, 0, &["a"]),
            ("c", 300, 100, 0, &["a"]),
            ("d", 90_000, 100, 0, &["b", "c"]),
        ]);
        let block = assemble(&pool, 100, 1, "aa", &wide_open());
        assert_eq!(block.len(), 4);
        assert_eq!(included(&block)[0], "a");
        assert_eq!(included(&block)[3], "d");
        assert_eq!(block.fee, 100 + 200 + 300 + 90_000);
    }

    #[test]
    fn chain_insertion_adds_intrinsic_costs_only() {
        let pool = make_pool(&[
            ("a", 1_000, 100, 4, NO_DEPS),
            ("b", 50_000, 200, 8, &["a"]),
        ]);
        let block = assemble(&pool, 100, 1, "aa", &wide_open());
        // Totals are the sum of the two transactions, not the package
        // aggregates (which would double-count a).
        assert_eq!(block.fee, 51_000);
        assert_eq!(block.size, 300);
        assert_eq!(block.weight, COINBASE_WEIGHT + 1_200);
        assert_eq!(block.sigops_cost, COINBASE_SIGOPS + 12);
    }

    // ------------------------------------------------------------------
    // Concrete scenarios
    // ------------------------------------------------------------------

    #[test]
    fn three_transaction_scenario() {
        // A at 10 sats/vB, B (child of A) at 8, C at 5; everything fits.
        let pool = make_pool(&[
            ("txa", 1_000, 100, 0, NO_DEPS),
            ("txb", 600, 100, 0, &["txa"]),
            ("txc", 500, 100, 0, NO_DEPS),
        ]);
        let block = assemble(&pool, 100, 1, "aa", &wide_open());
        assert_eq!(included(&block), vec!["txa", "txb", "txc"]);
        assert_eq!(block.fee, 1_000 + 600 + 500);
        assert!(check_block(&block, MAX_BLOCK_WEIGHT, MAX_BLOCK_SIGOPS_COST).is_ok());
    }

    #[test]
    fn budget_exhaustion_excludes_lowest_rate() {
        // Weight budget covers exactly A's and B's package estimates on top
        // of the coinbase reservation; C's package no longer fits.
        let pool = make_pool(&[
            ("txa", 1_000, 100, 0, NO_DEPS),
            ("txb", 600, 100, 0, &["txa"]),
            ("txc", 1_000, 200, 0, NO_DEPS),
        ]);
        let budgets = Budgets {
            weight_limit: COINBASE_WEIGHT + 400 + 800,
            min_tx_weight: 0,
            ..Budgets::default()
        };
        let block = assemble(&pool, 100, 1, "aa", &budgets);
        assert_eq!(included(&block), vec!["txa", "txb"]);
        assert_eq!(block.fee, 1_600);
        assert!(check_block(&block, budgets.weight_limit, budgets.sigops_limit).is_ok());
    }

    // ------------------------------------------------------------------
    // Budgets and stop conditions
    // ------------------------------------------------------------------

    #[test]
    fn weight_budget_never_exceeded() {
        let pool = make_pool(&[
            ("a", 10_000, 50_000, 0, NO_DEPS),
            ("b", 9_000, 50_000, 0, NO_DEPS),
            ("c", 8_000, 50_000, 0, NO_DEPS),
        ]);
        let budgets = Budgets {
            weight_limit: COINBASE_WEIGHT + 2 * 200_000,
            min_tx_weight: 0,
            ..Budgets::default()
        };
        let block = assemble(&pool, 100, 1, "aa", &budgets);
        assert!(block.weight <= budgets.weight_limit);
        assert_eq!(block.len(), 2);
    }

    #[test]
    fn sigops_budget_never_exceeded() {
        let pool = make_pool(&[
            ("a", 10_000, 100, 30_000, NO_DEPS),
            ("b", 9_000, 100, 30_000, NO_DEPS),
            ("c", 8_000, 100, 30_000, NO_DEPS),
        ]);
        let block = assemble(&pool, 100, 1, "aa", &wide_open());
        assert!(block.sigops_cost <= MAX_BLOCK_SIGOPS_COST);
        // 400 reserved + 2 * 30_000 fits; a third does not.
        assert_eq!(block.len(), 2);
    }

    #[test]
    fn min_weight_margin_stops_scan() {
        // After the first transaction, remaining headroom is below
        // min_tx_weight even though the second would technically fit.
        let pool = make_pool(&[
            ("a", 10_000, 100, 0, NO_DEPS),
            ("b", 100, 10, 0, NO_DEPS),
        ]);
        let budgets = Budgets {
            weight_limit: COINBASE_WEIGHT + 400 + 100,
            min_tx_weight: 200,
            ..Budgets::default()
        };
        let block = assemble(&pool, 100, 1, "aa", &budgets);
        assert_eq!(included(&block), vec!["a"]);
    }

    #[test]
    fn max_attempts_stops_scan_early() {
        // Two oversize packages ahead of a small one: with max_attempts = 2
        // the scan dies before reaching the fit.
        let pool = make_pool(&[
            ("big1", 90_000, 600_000, 0, NO_DEPS),
            ("big2", 80_000, 600_000, 0, NO_DEPS),
            ("small", 10, 100, 0, NO_DEPS),
        ]);
        let budgets = Budgets {
            weight_limit: 1_000_000,
            max_attempts: 2,
            min_tx_weight: 0,
            ..Budgets::default()
        };
        let block = assemble(&pool, 100, 1, "aa", &budgets);
        assert!(block.is_empty());

        // One more attempt lets the scan continue to the fitting candidate.
        let budgets = Budgets { max_attempts: 3, ..budgets };
        let block = assemble(&pool, 100, 1, "aa", &budgets);
        assert_eq!(included(&block), vec!["small"]);
    }

    #[test]
    fn duplicate_skips_do_not_count_as_attempts() {
        // Both children's packages outrank their shared parent, so the
        // parent is pulled in by the first child and is already included
        // when its own turn in the ranked list comes. With max_attempts = 1
        // that duplicate skip must not end the scan before the tail
        // candidate.
        let pool = make_pool(&[
            ("parent", 10, 100, 0, NO_DEPS),
            ("child1", 50_000, 100, 0, &["parent"]),
            ("child2", 40_000, 100, 0, &["parent"]),
            ("tail", 5, 100, 0, NO_DEPS),
        ]);
        assert_eq!(ranked_txids(&pool), vec!["child1", "child2", "parent", "tail"]);

        let budgets = Budgets { max_attempts: 1, ..Budgets::default() };
        let block = assemble(&pool, 100, 1, "aa", &budgets);
        assert_eq!(block.len(), 4);
        assert!(block.contains("tail"));
    }

    // ------------------------------------------------------------------
    // Determinism
    // ------------------------------------------------------------------

    #[test]
    fn identical_pools_assemble_identically() {
        let specs: &[(&str, u64, u64, u64, &[&str])] = &[
            ("a", 1_000, 100, 4, NO_DEPS),
            ("b", 2_000, 150, 8, &["a"]),
            ("c", 500, 300, 2, NO_DEPS),
            ("d", 4_000, 250, 16, &["b"]),
        ];
        let one = assemble(&make_pool(specs), 100, 1, "aa", &wide_open());
        let two = assemble(&make_pool(specs), 100, 1, "aa", &wide_open());
        assert_eq!(included(&one), included(&two));
        assert_eq!(one.fee, two.fee);
        assert_eq!(one.weight, two.weight);
    }

    // ------------------------------------------------------------------
    // Property: budgets and dependency order hold for arbitrary chains
    // ------------------------------------------------------------------

    proptest! {
        #[test]
        fn assembled_blocks_respect_budgets_and_order(
            fees in prop::collection::vec(1u64..50_000, 1..16),
            weight_limit in 4_000u64..60_000,
            sigops_limit in 400u64..2_000,
        ) {
            let n = fees.len();
            let ids: Vec<String> = (0..n).map(|i| format!("tx{i:02}")).collect();
            let dep_slices: Vec<Vec<&str>> = (0..n)
                .map(|i| if i % 3 == 0 || i == 0 { vec![] } else { vec![ids[i - 1].as_str()] })
                .collect();
            let mut specs: Vec<(&str, u64, u64, u64, &[&str])> = Vec::new();
            for i in 0..n {
                specs.push((
                    ids[i].as_str(),
                    fees[i],
                    50 + (i as u64) * 7 % 200,
                    (i as u64) % 40,
                    dep_slices[i].as_slice(),
                ));
            }
            let pool = make_pool(&specs);
            let budgets = Budgets {
                weight_limit,
                sigops_limit,
                min_tx_weight: 0,
                max_attempts: u32::MAX,
            };
            let block = assemble(&pool, 100, 1, "aa", &budgets);

            prop_assert!(block.weight <= weight_limit.max(COINBASE_WEIGHT));
            prop_assert!(block.sigops_cost <= sigops_limit.max(COINBASE_SIGOPS));

            // Every in-pool dependency of an included tx is included earlier.
            let order: Vec<&str> = block.txids().map(|s| s.as_str()).collect();
            for (txid, entry) in block.entries() {
                let own = order.iter().position(|id| *id == txid.as_str()).unwrap();
                for dep in &entry.depends {
                    let dep_pos = order.iter().position(|id| *id == dep.as_str());
                    prop_assert!(dep_pos.is_some(), "dependency {} not included", dep);
                    prop_assert!(dep_pos.unwrap() < own);
                }
            }
        }
    }
}
