//! Consensus parameter definitions.

use crate::money::{Amount, COIN};
use crate::Hash256;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

/// A hard checkpoint pinning the stake-modifier checksum at a height.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StakeModifierCheckpoint {
    pub height: i32,
    pub checksum: u32,
}

#[derive(Clone, Debug)]
pub struct ConsensusParams {
    pub network: Network,
    pub hash_genesis_block: Hash256,
    pub genesis_time: u32,
    /// Seconds that must elapse before a new stake modifier is computed.
    pub modifier_interval: i64,
    pub pos_target_spacing: i64,
    pub stake_min_age: i64,
    pub stake_max_age: i64,
    /// Stakes generated from inputs below this value are discarded.
    pub minimum_stake_value: Amount,
    pub coin_day_divisor: i64,
    pub stake_modifier_checkpoints: Vec<StakeModifierCheckpoint>,
}

impl ConsensusParams {
    pub fn stake_modifier_checkpoint(&self, height: i32) -> Option<u32> {
        self.stake_modifier_checkpoints
            .iter()
            .find(|checkpoint| checkpoint.height == height)
            .map(|checkpoint| checkpoint.checksum)
    }
}

#[derive(Debug)]
pub enum HexError {
    InvalidLength,
    InvalidHex,
}

pub fn hash256_from_hex(input: &str) -> Result<Hash256, HexError> {
    let mut hex = input.trim();
    if let Some(stripped) = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X")) {
        hex = stripped;
    }

    if hex.is_empty() || hex.len() > 64 || hex.len() % 2 == 1 {
        return Err(HexError::InvalidLength);
    }

    let mut hex_owned = hex.to_string();
    if hex_owned.len() < 64 {
        let mut padded = String::with_capacity(64);
        for _ in 0..(64 - hex_owned.len()) {
            padded.push('0');
        }
        padded.push_str(&hex_owned);
        hex_owned = padded;
    }

    let mut bytes = [0u8; 32];
    for (i, byte_out) in bytes.iter_mut().enumerate() {
        let start = i * 2;
        let byte = u8::from_str_radix(&hex_owned[start..start + 2], 16)
            .map_err(|_| HexError::InvalidHex)?;
        *byte_out = byte;
    }
    bytes.reverse();

    Ok(bytes)
}

pub fn consensus_params(network: Network) -> ConsensusParams {
    match network {
        Network::Mainnet => mainnet_consensus_params(),
        Network::Testnet => testnet_consensus_params(),
        Network::Regtest => regtest_consensus_params(),
    }
}

/// Baseline hard checkpoint: the checksum of the genesis stake modifier.
const GENESIS_MODIFIER_CHECKSUM: u32 = 0xfd11_f4e7;

fn stake_modifier_checkpoints() -> Vec<StakeModifierCheckpoint> {
    vec![StakeModifierCheckpoint {
        height: 0,
        checksum: GENESIS_MODIFIER_CHECKSUM,
    }]
}

fn mainnet_consensus_params() -> ConsensusParams {
    ConsensusParams {
        network: Network::Mainnet,
        hash_genesis_block: hash256_from_hex(
            "000000063b941b0366212a2abe45f8ae491c50157c0ff6653a614acdd6ebc8d6",
        )
        .expect("mainnet genesis hash"),
        genesis_time: 1_550_102_400,
        modifier_interval: 60 * 60 * 3,
        pos_target_spacing: 60,
        stake_min_age: 60 * 60,
        stake_max_age: 60 * 60 * 24 * 30,
        minimum_stake_value: 10_000 * COIN,
        coin_day_divisor: 200,
        stake_modifier_checkpoints: stake_modifier_checkpoints(),
    }
}

fn testnet_consensus_params() -> ConsensusParams {
    ConsensusParams {
        network: Network::Testnet,
        hash_genesis_block: hash256_from_hex(
            "000000087e94ae17eae269b682b95eb594365945484306edff95d20f02771ce4",
        )
        .expect("testnet genesis hash"),
        genesis_time: 1_550_188_800,
        modifier_interval: 60 * 20,
        pos_target_spacing: 60,
        stake_min_age: 60 * 10,
        stake_max_age: 60 * 60 * 24,
        minimum_stake_value: 1_000 * COIN,
        coin_day_divisor: 200,
        stake_modifier_checkpoints: stake_modifier_checkpoints(),
    }
}

fn regtest_consensus_params() -> ConsensusParams {
    ConsensusParams {
        network: Network::Regtest,
        hash_genesis_block: hash256_from_hex(
            "0000000fc954c3c9a732e37abd64d4f8fa21d6ab3bb5ffde24ebde2e90994f02",
        )
        .expect("regtest genesis hash"),
        genesis_time: 1_296_688_602,
        modifier_interval: 60 * 10,
        pos_target_spacing: 60,
        stake_min_age: 60,
        stake_max_age: 60 * 60,
        minimum_stake_value: 100 * COIN,
        coin_day_divisor: 200,
        stake_modifier_checkpoints: stake_modifier_checkpoints(),
    }
}
