//! Subsidy schedule arithmetic.
//!
//! The subsidy starts at [`INITIAL_SUBSIDY`] and halves every
//! [`HALVING_INTERVAL`] blocks: `INITIAL_SUBSIDY >> (height /
//! HALVING_INTERVAL)`, reaching zero after [`MAX_HALVINGS`] halvings.
//! A block's full reward (subsidy plus fees) lives on
//! [`Block::reward`](crate::block::Block::reward).

use crate::constants::{HALVING_INTERVAL, INITIAL_SUBSIDY, MAX_HALVINGS};

/// Number of halvings that have occurred at `height`.
pub fn halvings(height: u64) -> u64 {
    height / HALVING_INTERVAL
}

/// Newly issued currency for a block at `height`, in sats.
///
/// Shifting past the integer's width is defined as zero, not left to
/// overflow: heights at or beyond [`MAX_HALVINGS`] halvings pay nothing.
pub fn subsidy(height: u64) -> u64 {
    let halvings = halvings(height);
    if halvings >= MAX_HALVINGS {
        return 0;
    }
    INITIAL_SUBSIDY >> halvings
}
