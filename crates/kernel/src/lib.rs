//! The proof-of-stake kernel.
//!
//! Decides whether a coinstake is a valid stake at a given moment, and how
//! each connected block contributes to the 64-bit stake modifier that makes
//! future stake outcomes unpredictable. Every function here is
//! consensus-critical: all nodes must reach bit-identical results.
//!
//! Callers hold the chain-state lock for the duration of any kernel call;
//! the kernel itself keeps no state between calls.

pub mod checksum;
pub mod connect;
pub mod error;
pub mod modifier;
pub mod selection;
pub mod stake;
pub mod target;
pub mod trace;

use emberd_chainstate::{ActiveChain, BlockIndex, NetworkClock};
use emberd_consensus::ConsensusParams;

pub use checksum::{check_stake_modifier_checkpoints, stake_modifier_checksum};
pub use connect::connect_block_stake;
pub use error::KernelError;
pub use modifier::{compute_next_stake_modifier, StakeModifier};
pub use selection::{selection_interval, selection_interval_section};
pub use stake::{
    check_kernel_script, check_proof_of_stake, check_stake_kernel_hash, kernel_stake_modifier,
    stake_proof_hash, stake_time_weight, KernelModifier,
};
pub use target::{compact_to_u256, u256_to_compact, CompactError};

/// Read-only collaborator handles every kernel entry point works against.
pub struct ChainView<'a> {
    pub index: &'a BlockIndex,
    pub active: &'a ActiveChain,
    pub clock: &'a dyn NetworkClock,
    pub params: &'a ConsensusParams,
}
