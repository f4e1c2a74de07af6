//! Consensus-wide constants shared across validation.

/// Exponent base of the stake-modifier selection-section geometry.
pub const MODIFIER_INTERVAL_RATIO: i64 = 3;

/// Coinbase and coinstake outputs can only be spent after this number of new blocks.
pub const COINBASE_MATURITY: i32 = 100;

/// The maximum allowed size for a serialized block, in bytes (network rule).
pub const MAX_BLOCK_SIZE: u32 = 2_000_000;
