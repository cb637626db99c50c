//! Protocol constants. All monetary values in satoshis (1 BTC = 10^8 sats).

pub const COIN: u64 = 100_000_000;

/// Newly issued currency for a block before any halving.
pub const INITIAL_SUBSIDY: u64 = 50 * COIN;

/// Number of blocks between subsidy halvings.
pub const HALVING_INTERVAL: u64 = 210_000;

/// Halvings at or beyond this count yield a zero subsidy; shifting a 64-bit
/// amount by 64 or more is otherwise undefined.
pub const MAX_HALVINGS: u64 = 64;

/// Maximum allowed block weight (network rule, BIP 141).
pub const MAX_BLOCK_WEIGHT: u64 = 4_000_000;

/// Maximum allowed signature-operation cost in a block (network rule).
pub const MAX_BLOCK_SIGOPS_COST: u64 = 80_000;

/// Ratio between weight units and virtual-size units.
pub const WITNESS_SCALE_FACTOR: u64 = 4;

/// 60 bytes is the lower bound for the size of a valid serialized
/// transaction, so no standard transaction weighs less than this.
pub const MIN_TRANSACTION_WEIGHT: u64 = WITNESS_SCALE_FACTOR * 60;

/// Weight reserved in a fresh template for the coinbase transaction.
pub const COINBASE_WEIGHT: u64 = 4_000;

/// Sigops allowance reserved in a fresh template for the coinbase.
pub const COINBASE_SIGOPS: u64 = 400;

/// Default bound on failed-fit skips before assembly gives up on a scan.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1_000;
