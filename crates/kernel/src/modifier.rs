//! Stake-modifier computation.
//!
//! The stake modifier keeps a txout owner from computing the future
//! proof-of-stake its coins will generate at the time the transaction
//! confirms: every kernel hash mixes in a modifier that did not exist yet
//! when the coins were created. Each modifier bit is contributed by one
//! block selected from a past block group, and the modifier is recomputed
//! only once per modifier interval so that an attacker cannot grind
//! additional bits into it even after generating a run of blocks.

use std::collections::HashSet;

use emberd_chainstate::{BlockIndex, BlockIndexNode};
use emberd_consensus::{ConsensusParams, Hash256};
use emberd_log::log_debug;
use emberd_primitives::encoding::Encoder;
use emberd_primitives::hash::sha256d;
use primitive_types::U256;

use crate::error::KernelError;
use crate::selection::{selection_interval, selection_interval_section, STAKE_MODIFIER_SECTIONS};
use crate::trace;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StakeModifier {
    pub modifier: u64,
    /// True when this block starts a new modifier interval bucket.
    pub generated: bool,
}

/// Walks back from `node` to the last ancestor that generated a modifier.
fn last_stake_modifier(
    index: &BlockIndex,
    node: &BlockIndexNode,
) -> Result<(u64, i64), KernelError> {
    let mut cursor = node;
    while cursor.prev.is_some() && !cursor.generated_stake_modifier() {
        let prev_hash = cursor.prev.as_ref().expect("prev checked");
        cursor = index.get(prev_hash).ok_or(KernelError::NoPriorModifier)?;
    }
    if !cursor.generated_stake_modifier() {
        return Ok((0, 0));
    }
    Ok((cursor.stake_modifier, cursor.block_time()))
}

/// Hash driving one selection comparison: the candidate's proof hash mixed
/// with the previous modifier.
pub(crate) fn selection_hash(proof_hash: &Hash256, prev_modifier: u64) -> U256 {
    let mut encoder = Encoder::new();
    encoder.write_hash_le(proof_hash);
    encoder.write_u64_le(prev_modifier);
    U256::from_little_endian(&sha256d(&encoder.into_inner()))
}

/// Selects one block from `sorted_by_timestamp`, skipping already selected
/// blocks and stopping at the first candidate past `selection_stop` once a
/// choice exists. Returns `None` only when every candidate is consumed.
pub(crate) fn select_block_from_candidates<'a>(
    index: &'a BlockIndex,
    sorted_by_timestamp: &[(i64, Hash256)],
    selected: &HashSet<Hash256>,
    selection_stop: i64,
    prev_modifier: u64,
) -> Result<Option<&'a BlockIndexNode>, KernelError> {
    let mut best: Option<(&BlockIndexNode, U256)> = None;

    for (_, hash) in sorted_by_timestamp {
        let node = index
            .get(hash)
            .ok_or(KernelError::BlockNotIndexed(*hash))?;
        if best.is_some() && node.block_time() > selection_stop {
            break;
        }
        if selected.contains(hash) {
            continue;
        }

        let proof_hash = if node.is_proof_of_stake() {
            &node.hash_proof_of_stake
        } else {
            &node.hash
        };
        let mut hash_selection = selection_hash(proof_hash, prev_modifier);
        // Proof-of-stake blocks are favored over proof-of-work blocks by
        // dividing their selection hash by 2**32, preserving the energy
        // efficiency property of the modifier.
        if node.is_proof_of_stake() {
            hash_selection >>= 32;
        }

        let improves = match &best {
            Some((_, best_hash)) => hash_selection < *best_hash,
            None => true,
        };
        if improves {
            best = Some((node, hash_selection));
        }
    }

    if trace::print_stake_modifier() {
        if let Some((_, best_hash)) = &best {
            log_debug!("select_block_from_candidates: selection hash={best_hash:064x}");
        }
    }

    Ok(best.map(|(node, _)| node))
}

/// Computes the stake modifier persisted on the block whose parent is
/// `prev` (`None` for the genesis block).
pub fn compute_next_stake_modifier(
    index: &BlockIndex,
    prev: Option<&BlockIndexNode>,
    params: &ConsensusParams,
) -> Result<StakeModifier, KernelError> {
    let prev = match prev {
        // The genesis block's modifier is 0.
        None => {
            return Ok(StakeModifier {
                modifier: 0,
                generated: true,
            })
        }
        Some(prev) => prev,
    };

    // If the current modifier is not old enough, reuse it.
    let (prev_modifier, prev_modifier_time) = last_stake_modifier(index, prev)?;
    if trace::debug_enabled() {
        log_debug!(
            "compute_next_stake_modifier: prev modifier=0x{prev_modifier:016x} epoch={prev_modifier_time}"
        );
    }
    let interval = params.modifier_interval;
    if prev_modifier_time / interval >= prev.block_time() / interval {
        return Ok(StakeModifier {
            modifier: prev_modifier,
            generated: false,
        });
    }

    // Gather candidate blocks covering the selection interval before the
    // current bucket boundary, sorted ascending by (time, hash).
    let total_interval = selection_interval(interval);
    let selection_start = (prev.block_time() / interval) * interval - total_interval;
    let mut candidates: Vec<(i64, Hash256)> =
        Vec::with_capacity((STAKE_MODIFIER_SECTIONS as i64 * interval / params.pos_target_spacing)
            .max(0) as usize);
    let mut cursor = Some(prev);
    while let Some(node) = cursor {
        if node.block_time() < selection_start {
            break;
        }
        candidates.push((node.block_time(), node.hash));
        cursor = match &node.prev {
            Some(hash) => Some(index.get(hash).ok_or(KernelError::BlockNotIndexed(*hash))?),
            None => None,
        };
    }
    let height_first = cursor.map(|node| node.height + 1).unwrap_or(0);
    candidates.reverse();
    candidates.sort();

    // One selection round per modifier bit.
    let mut new_modifier: u64 = 0;
    let mut selection_stop = selection_start;
    let mut selected: HashSet<Hash256> = HashSet::new();
    let mut selected_nodes: Vec<&BlockIndexNode> = Vec::new();
    let rounds = candidates.len().min(STAKE_MODIFIER_SECTIONS);
    for round in 0..rounds {
        selection_stop += selection_interval_section(interval, round);
        let node = select_block_from_candidates(
            index,
            &candidates,
            &selected,
            selection_stop,
            prev_modifier,
        )?
        .ok_or(KernelError::SelectionFailure {
            round: round as u32,
        })?;

        new_modifier |= node.stake_entropy_bit() << round;
        selected.insert(node.hash);
        if trace::print_stake_modifier() {
            log_debug!(
                "compute_next_stake_modifier: selected round {round} stop={selection_stop} height={} bit={}",
                node.height,
                node.stake_entropy_bit()
            );
        }
        selected_nodes.push(node);
    }

    if trace::debug_enabled() && trace::print_stake_modifier() {
        log_selection_map(index, prev, height_first, &selected_nodes);
    }

    Ok(StakeModifier {
        modifier: new_modifier,
        generated: true,
    })
}

/// Dumps which candidate heights were selected: '-' unselected PoW,
/// '=' unselected PoS, 'W' selected PoW, 'S' selected PoS.
fn log_selection_map(
    index: &BlockIndex,
    prev: &BlockIndexNode,
    height_first: i32,
    selected: &[&BlockIndexNode],
) {
    let len = (prev.height - height_first + 1).max(0) as usize;
    let mut map = vec![b'-'; len];

    let mut cursor = Some(prev);
    while let Some(node) = cursor {
        if node.height < height_first {
            break;
        }
        if node.is_proof_of_stake() {
            map[(node.height - height_first) as usize] = b'=';
        }
        cursor = index.prev_of(node);
    }
    for node in selected {
        map[(node.height - height_first) as usize] =
            if node.is_proof_of_stake() { b'S' } else { b'W' };
    }

    log_debug!(
        "compute_next_stake_modifier: selection height [{height_first}, {}] map {}",
        prev.height,
        String::from_utf8_lossy(&map)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use emberd_consensus::{consensus_params, Network};
    use emberd_primitives::block::BlockHeader;

    fn header(time: u32) -> BlockHeader {
        BlockHeader {
            version: 1,
            prev_block: [0u8; 32],
            merkle_root: [0u8; 32],
            time,
            bits: 0x1e0f_fff0,
            nonce: 0,
        }
    }

    fn node(hash: Hash256, prev: Option<Hash256>, height: i32, time: u32) -> BlockIndexNode {
        BlockIndexNode::new(hash, prev, height, &header(time))
    }

    fn hex32(hex: &str) -> Hash256 {
        let mut out = [0u8; 32];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).expect("hex");
        }
        out
    }

    #[test]
    fn genesis_modifier_is_zero_and_generated() {
        let index = BlockIndex::new();
        let params = consensus_params(Network::Mainnet);
        let result = compute_next_stake_modifier(&index, None, &params).expect("genesis");
        assert_eq!(
            result,
            StakeModifier {
                modifier: 0,
                generated: true
            }
        );
    }

    #[test]
    fn same_bucket_reuses_parent_modifier() {
        // Parent sits in the same modifier bucket as the last generated
        // modifier, so the child must inherit it without generating.
        let params = consensus_params(Network::Mainnet);
        let mut index = BlockIndex::new();

        let mut genesis = node([0x02; 32], None, 0, 1_599_998_000);
        genesis.set_stake_modifier(0, true);
        let mut parent = node([0x04; 32], Some(genesis.hash), 1, 1_600_000_000);
        parent.set_stake_modifier(0xdead_beef_0badu64, true);
        let parent_clone = parent.clone();
        index.insert(genesis);
        index.insert(parent);

        // Child at 1_600_000_300 shares the parent's 3-hour bucket.
        let result =
            compute_next_stake_modifier(&index, Some(&parent_clone), &params).expect("child");
        assert_eq!(result.modifier, 0xdead_beef_0badu64);
        assert!(!result.generated);
    }

    #[test]
    fn tie_on_time_resolves_by_hash_order_and_selection_hash() {
        // Two candidates share a timestamp; iteration order is ascending
        // by hash bytes and the smaller selection hash wins.
        let mut index = BlockIndex::new();
        let hash_a = sha256d(b"tieA");
        let hash_b = sha256d(b"tieB");
        index.insert(node(hash_a, None, 1, 1_000));
        index.insert(node(hash_b, None, 2, 1_000));

        let mut candidates = vec![(1_000i64, hash_a), (1_000i64, hash_b)];
        candidates.sort();
        // Byte order puts B first.
        assert_eq!(candidates[0].1, hash_b);

        let selected = HashSet::new();
        let chosen = select_block_from_candidates(&index, &candidates, &selected, 2_000, 0)
            .expect("select")
            .expect("candidate available");
        assert_eq!(chosen.hash, hash_b);

        // Pinned expected selection hashes for both candidates.
        let sel_a = selection_hash(&hash_a, 0);
        let sel_b = selection_hash(&hash_b, 0);
        assert_eq!(
            sel_a,
            U256::from_little_endian(&hex32(
                "7e8deb3806ad8299aa48b949e7de04f95118f3267c390915137d1db053b93bfa"
            ))
        );
        assert_eq!(
            sel_b,
            U256::from_little_endian(&hex32(
                "992d0d1e2cfe1336ff8d8c21c613ccc68489309ae2a3e30cf5ba6608644b674d"
            ))
        );
        assert!(sel_b < sel_a);
    }

    #[test]
    fn proof_of_stake_outranks_proof_of_work_on_equal_proof_hash() {
        // A PoS candidate whose proof hash equals a PoW candidate's block
        // hash hashes to the same selection value before the shift, so the
        // PoS block must win.
        let mut index = BlockIndex::new();
        let shared_proof = sha256d(b"shared proof");
        let pow = node(shared_proof, None, 1, 1_000);
        let mut pos = node(sha256d(b"pos block"), None, 2, 1_000);
        pos.set_proof_of_stake(shared_proof);
        index.insert(pow.clone());
        index.insert(pos.clone());

        let mut candidates = vec![
            (1_000i64, pow.hash),
            (1_000i64, pos.hash),
        ];
        candidates.sort();

        let selected = HashSet::new();
        let chosen = select_block_from_candidates(&index, &candidates, &selected, 2_000, 77)
            .expect("select")
            .expect("candidate available");
        assert_eq!(chosen.hash, pos.hash);
    }

    #[test]
    fn exhausted_candidates_select_nothing() {
        let mut index = BlockIndex::new();
        let only = node(sha256d(b"solo"), None, 1, 1_000);
        index.insert(only.clone());

        let candidates = vec![(1_000i64, only.hash)];
        let mut selected = HashSet::new();
        selected.insert(only.hash);

        let chosen = select_block_from_candidates(&index, &candidates, &selected, 2_000, 0)
            .expect("select");
        assert!(chosen.is_none());
    }

    #[test]
    fn unknown_candidate_is_a_hard_error() {
        let index = BlockIndex::new();
        let candidates = vec![(1_000i64, [0x42; 32])];
        let selected = HashSet::new();
        let result = select_block_from_candidates(&index, &candidates, &selected, 2_000, 0);
        assert!(matches!(result, Err(KernelError::BlockNotIndexed(_))));
    }
}
