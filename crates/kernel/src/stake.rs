//! Kernel stake checks: modifier resolution, the kernel hash, and
//! coinstake validation.

use emberd_chainstate::{BlockIndexNode, FlatFileStore, TxIndex};
use emberd_consensus::money::COIN;
use emberd_consensus::{ConsensusParams, Hash256};
use emberd_log::log_debug;
use emberd_primitives::block::{Block, BlockHeader};
use emberd_primitives::encoding::{Decodable, Decoder, Encoder};
use emberd_primitives::hash::sha256d;
use emberd_primitives::outpoint::OutPoint;
use emberd_primitives::transaction::Transaction;
use emberd_script::extract_key_id;
use emberd_storage::KeyValueStore;
use primitive_types::U256;

use crate::error::KernelError;
use crate::selection::selection_interval;
use crate::target::compact_to_u256;
use crate::trace;
use crate::ChainView;

/// The modifier that rules a kernel, with the height and time of the block
/// that generated it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KernelModifier {
    pub modifier: u64,
    pub height: i32,
    pub time: i64,
}

/// Coin-age weight accrued between two points in time; used by minting and
/// RPC reporting.
pub fn stake_time_weight(params: &ConsensusParams, interval_begin: i64, interval_end: i64) -> i64 {
    interval_end - interval_begin - params.stake_min_age
}

/// Resolves the stake modifier ruling a kernel whose coins sit in the block
/// `hash_from`, by walking forward until a selection interval has elapsed.
///
/// `prev` is the predecessor of the block under test, i.e. the tip of the
/// chain being validated, which may sit on a side branch. The walk therefore
/// follows a temporary chain of off-branch ancestors where the active chain
/// cannot serve successors.
///
/// `Ok(None)` means the stake is not yet verifiable because this node's
/// chain does not reach far enough; callers defer and retry.
pub fn kernel_stake_modifier(
    view: &ChainView<'_>,
    prev: &BlockIndexNode,
    hash_from: &Hash256,
    _n_time_tx: u32,
    verbose: bool,
) -> Result<Option<KernelModifier>, KernelError> {
    let from = view
        .index
        .get(hash_from)
        .ok_or(KernelError::BlockNotIndexed(*hash_from))?;
    let mut info = KernelModifier {
        modifier: 0,
        height: from.height,
        time: from.block_time(),
    };
    let total_interval = selection_interval(view.params.modifier_interval);

    // Off-branch ancestors of `prev`, oldest first. The depth bound uses
    // `from.height - 1` so the chain can include `from` itself.
    let depth = prev.height - (from.height - 1);
    let mut tmp_chain: Vec<&BlockIndexNode> = Vec::new();
    let mut cursor = Some(prev);
    let mut walked = 1;
    while walked <= depth {
        let node = match cursor {
            Some(node) if !view.active.contains(node) => node,
            _ => break,
        };
        tmp_chain.push(node);
        cursor = view.index.prev_of(node);
        walked += 1;
    }
    tmp_chain.reverse();

    let mut consumed = 0usize;
    let mut current = from;
    while info.time < from.block_time() + total_interval {
        let reached = current;
        let next = if !tmp_chain.is_empty() && current.height >= tmp_chain[0].height - 1 {
            let node = tmp_chain.get(consumed).copied();
            consumed += 1;
            node
        } else {
            view.active
                .next_after(current)
                .and_then(|hash| view.index.get(hash))
        };

        if consumed > tmp_chain.len() || next.is_none() {
            // Reached the best block; happens when this node is behind.
            let stale = reached.block_time() + view.params.stake_min_age - total_interval
                > view.clock.adjusted_time();
            if verbose || stale {
                return Err(KernelError::ReachedBestBlock {
                    height: reached.height,
                });
            }
            return Ok(None);
        }
        current = next.expect("checked above");

        if current.generated_stake_modifier() {
            info.height = current.height;
            info.time = current.block_time();
        }
    }

    info.modifier = current.stake_modifier;
    if trace::print_stake_modifier() {
        log_debug!(
            "kernel_stake_modifier: modifier=0x{:016x} from height {} time {}",
            info.modifier,
            info.height,
            info.time
        );
    }
    Ok(Some(info))
}

/// The kernel proof hash over the canonical 28-byte stream. The spent
/// output's own timestamp is its enclosing header's time, serialized a
/// second time after the offset. All timestamps are 32-bit on the wire.
pub fn stake_proof_hash(
    modifier: u64,
    time_from: u32,
    tx_prev_offset: u32,
    prevout_index: u32,
    n_time_tx: u32,
) -> Hash256 {
    let mut encoder = Encoder::new();
    encoder.write_u64_le(modifier);
    encoder.write_u32_le(time_from);
    encoder.write_u32_le(tx_prev_offset);
    encoder.write_u32_le(time_from);
    encoder.write_u32_le(prevout_index);
    encoder.write_u32_le(n_time_tx);
    sha256d(&encoder.into_inner())
}

/// Checks whether a kernel meets the weighted target at `n_time_tx`.
///
/// `Ok(Some(hash))` carries the proof hash to persist on the index node;
/// `Ok(None)` defers (modifier not yet resolvable).
#[allow(clippy::too_many_arguments)]
pub fn check_stake_kernel_hash(
    view: &ChainView<'_>,
    prev: &BlockIndexNode,
    n_bits: u32,
    header_from: &BlockHeader,
    tx_prev_offset: u32,
    tx_prev: &Transaction,
    prevout: &OutPoint,
    n_time_tx: u32,
    verbose: bool,
) -> Result<Option<Hash256>, KernelError> {
    let time_from = header_from.block_time();
    if (n_time_tx as i64) < time_from {
        return Err(KernelError::TimeViolation);
    }
    if time_from + view.params.stake_min_age > n_time_tx as i64 {
        return Err(KernelError::MinAgeViolation);
    }

    let target_per_coin_day = compact_to_u256(n_bits)?;
    let output = tx_prev
        .vout
        .get(prevout.index as usize)
        .ok_or(KernelError::PrevoutOutOfRange {
            index: prevout.index,
        })?;
    let value_in = output.value;
    if value_in < view.params.minimum_stake_value {
        return Err(KernelError::MinValueViolation);
    }

    // Weight starts from zero at the min-age mark and saturates at the
    // max-age cap, so old rich outputs cannot dominate the hash while
    // difficulty is low.
    let time_weight = (n_time_tx as i64 - time_from)
        .min(view.params.stake_max_age - view.params.stake_min_age);
    let coin_day_weight = U256::from(value_in as u64) * U256::from(time_weight as u64)
        / U256::from(COIN as u64)
        / U256::from(view.params.coin_day_divisor as u64);

    let resolved =
        match kernel_stake_modifier(view, prev, &header_from.hash(), n_time_tx, verbose)? {
            Some(resolved) => resolved,
            None => return Ok(None),
        };

    let hash_proof_of_stake = stake_proof_hash(
        resolved.modifier,
        header_from.time,
        tx_prev_offset,
        prevout.index,
        n_time_tx,
    );

    // 256-bit multiply, saturating on overflow: an oversized weight
    // trivially accepts rather than wrapping.
    let (mut weighted_target, overflowed) = coin_day_weight.overflowing_mul(target_per_coin_day);
    if overflowed {
        weighted_target = U256::max_value();
    }

    if U256::from_little_endian(&hash_proof_of_stake) > weighted_target {
        return Err(KernelError::HashAboveTarget);
    }
    Ok(Some(hash_proof_of_stake))
}

/// True iff both scripts resolve to the same, present key id: the stake
/// output must pay the key the consumed output was paid to.
pub fn check_kernel_script(script_in: &[u8], script_out: &[u8]) -> bool {
    match (extract_key_id(script_in), extract_key_id(script_out)) {
        (Some(key_in), Some(key_out)) => key_in == key_out,
        _ => false,
    }
}

/// Validates the coinstake of `block` against the kernel protocol: reads
/// the spent output through the tx index and block files, checks the
/// script-key identity, then applies the kernel hash check.
pub fn check_proof_of_stake<S: KeyValueStore>(
    view: &ChainView<'_>,
    tx_index: Option<&TxIndex<S>>,
    block_files: &FlatFileStore,
    block: &Block,
    prev: &BlockIndexNode,
) -> Result<Option<Hash256>, KernelError> {
    let tx = block
        .transactions
        .get(1)
        .ok_or(KernelError::NotCoinStake)?;
    if !tx.is_coin_stake() {
        return Err(KernelError::NotCoinStake);
    }
    // The kernel (input 0) must match the stake hash target per coin age.
    let txin = &tx.vin[0];

    // The transaction index is required to reach the spent output's block
    // header.
    let tx_index = tx_index.ok_or(KernelError::TxIndexUnavailable)?;
    let location = tx_index
        .get(&txin.prevout.hash)?
        .ok_or(KernelError::TxIndexMiss(txin.prevout.hash))?;

    let bytes = block_files.read(location.block)?;
    let mut decoder = Decoder::new(&bytes);
    let header_from = BlockHeader::consensus_decode(&mut decoder)?;
    decoder.skip(location.tx_offset as usize)?;
    let tx_prev = Transaction::consensus_decode(&mut decoder)?;
    let tx_prev_id = tx_prev.txid();
    if tx_prev_id != txin.prevout.hash {
        return Err(KernelError::TxidMismatch {
            expected: txin.prevout.hash,
            found: tx_prev_id,
        });
    }

    let spent_output = tx_prev
        .vout
        .get(txin.prevout.index as usize)
        .ok_or(KernelError::PrevoutOutOfRange {
            index: txin.prevout.index,
        })?;
    if !check_kernel_script(&spent_output.script_pubkey, &tx.vout[1].script_pubkey) {
        return Err(KernelError::ScriptIdentityMismatch);
    }

    check_stake_kernel_hash(
        view,
        prev,
        block.header.bits,
        &header_from,
        BlockHeader::SERIALIZED_SIZE,
        &tx_prev,
        &txin.prevout,
        block.header.time,
        false,
    )
}
