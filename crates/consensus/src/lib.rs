//! Consensus constants and per-network parameters.

pub mod constants;
pub mod money;
pub mod params;

pub use params::{consensus_params, ConsensusParams, Network, StakeModifierCheckpoint};

pub type Hash256 = [u8; 32];
