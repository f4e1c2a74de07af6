//! Stake bookkeeping at block connection.

use emberd_chainstate::BlockIndex;
use emberd_consensus::{ConsensusParams, Hash256};
use emberd_log::log_debug;

use crate::checksum::{check_stake_modifier_checkpoints, stake_modifier_checksum};
use crate::error::KernelError;
use crate::modifier::compute_next_stake_modifier;
use crate::trace;

/// Computes and persists the stake modifier and its checksum on a newly
/// connected block, then enforces the hard checkpoints. The node must
/// already carry its proof-of-stake flag, proof hash, and entropy bit;
/// its parent must have been connected first.
pub fn connect_block_stake(
    index: &mut BlockIndex,
    hash: &Hash256,
    params: &ConsensusParams,
) -> Result<(), KernelError> {
    let node = index.get(hash).ok_or(KernelError::BlockNotIndexed(*hash))?;
    let prev_hash = node.prev;
    let height = node.height;

    let (modifier, prev_checksum) = {
        let prev = match &prev_hash {
            Some(hash) => Some(index.get(hash).ok_or(KernelError::BlockNotIndexed(*hash))?),
            None => None,
        };
        let modifier = compute_next_stake_modifier(index, prev, params)?;
        (modifier, prev.map(|prev| prev.stake_modifier_checksum))
    };

    let node = index.get_mut(hash).expect("node fetched above");
    node.set_stake_modifier(modifier.modifier, modifier.generated);
    let checksum = stake_modifier_checksum(
        prev_checksum,
        node.flags,
        &node.hash_proof_of_stake,
        node.stake_modifier,
    );
    node.stake_modifier_checksum = checksum;

    if trace::debug_enabled() && modifier.generated {
        log_debug!(
            "connect_block_stake: height={height} modifier=0x{:016x} checksum=0x{checksum:08x}",
            modifier.modifier
        );
    }

    if !check_stake_modifier_checkpoints(params, height, checksum) {
        return Err(KernelError::CheckpointMismatch { height, checksum });
    }
    Ok(())
}
