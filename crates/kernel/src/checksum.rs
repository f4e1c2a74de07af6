//! Stake-modifier checksums and hard checkpoints.

use emberd_consensus::{ConsensusParams, Hash256};
use emberd_primitives::encoding::Encoder;
use emberd_primitives::hash::sha256d;
use primitive_types::U256;

/// Checksum of one node's stake state: the top 32 bits of
/// `sha256d(prev_checksum? || flags || hash_proof_of_stake || modifier)`.
/// The previous checksum is omitted for the genesis node. Because each
/// checksum folds in its parent's, any mutation of an ancestor's stake
/// fields changes every descendant's checksum.
pub fn stake_modifier_checksum(
    prev_checksum: Option<u32>,
    flags: u32,
    hash_proof_of_stake: &Hash256,
    stake_modifier: u64,
) -> u32 {
    let mut encoder = Encoder::new();
    if let Some(prev) = prev_checksum {
        encoder.write_u32_le(prev);
    }
    encoder.write_u32_le(flags);
    encoder.write_hash_le(hash_proof_of_stake);
    encoder.write_u64_le(stake_modifier);

    let digest = sha256d(&encoder.into_inner());
    (U256::from_little_endian(&digest) >> 224).low_u32()
}

/// Accepts unless a hard checkpoint exists at `height` and disagrees.
pub fn check_stake_modifier_checkpoints(
    params: &ConsensusParams,
    height: i32,
    checksum: u32,
) -> bool {
    match params.stake_modifier_checkpoint(height) {
        Some(expected) => expected == checksum,
        None => true,
    }
}
