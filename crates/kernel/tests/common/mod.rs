#![allow(dead_code)]

use emberd_chainstate::{ActiveChain, BlockIndex, BlockIndexNode};
use emberd_consensus::{consensus_params, ConsensusParams, Hash256, Network};
use emberd_kernel::connect_block_stake;
use emberd_primitives::block::BlockHeader;
use emberd_primitives::encoding::Encoder;
use emberd_primitives::hash::sha256d;

pub const T0: u32 = 1_600_000_000;
pub const SPACING: u32 = 60;
pub const TEST_BITS: u32 = 0x1e0f_fff0;

/// Regtest parameters: 10-minute modifier interval, 60 s min age, 1 h max
/// age, 100-coin stake minimum.
pub fn test_params() -> ConsensusParams {
    consensus_params(Network::Regtest)
}

pub fn hex32(hex: &str) -> Hash256 {
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).expect("hex");
    }
    out
}

pub fn header_at(prev_hash: Hash256, height: i32, nonce: u32) -> BlockHeader {
    BlockHeader {
        version: 1,
        prev_block: prev_hash,
        merkle_root: [0u8; 32],
        time: T0 + SPACING * height as u32,
        bits: TEST_BITS,
        nonce,
    }
}

/// Proof hash recorded on synthetic proof-of-stake nodes.
pub fn proof_hash_for(height: i32) -> Hash256 {
    let mut encoder = Encoder::new();
    encoder.write_bytes(b"proof");
    encoder.write_u32_le(height as u32);
    sha256d(&encoder.into_inner())
}

pub struct TestChain {
    pub index: BlockIndex,
    pub active: ActiveChain,
    pub params: ConsensusParams,
    /// Header of the block at each height; `headers[0]` is the synthetic
    /// genesis header (the genesis hash itself comes from the parameters).
    pub headers: Vec<BlockHeader>,
}

impl TestChain {
    pub fn node_at(&self, height: i32) -> &BlockIndexNode {
        let hash = self.active.at(height).expect("height on active chain");
        self.index.get(hash).expect("node indexed")
    }

    pub fn tip(&self) -> &BlockIndexNode {
        self.node_at(self.active.height())
    }
}

/// Builds a connected chain of `length` blocks above genesis, one block per
/// minute, every third block proof-of-stake.
pub fn build_chain(length: i32) -> TestChain {
    let params = test_params();
    let mut index = BlockIndex::new();
    let mut active = ActiveChain::new();

    let genesis_header = BlockHeader {
        version: 1,
        prev_block: [0u8; 32],
        merkle_root: [0u8; 32],
        time: T0,
        bits: TEST_BITS,
        nonce: 0,
    };
    let genesis = BlockIndexNode::new(params.hash_genesis_block, None, 0, &genesis_header);
    index.insert(genesis);
    active.push(params.hash_genesis_block);
    connect_block_stake(&mut index, &params.hash_genesis_block, &params).expect("connect genesis");

    let mut headers = vec![genesis_header];
    let mut prev_hash = params.hash_genesis_block;
    for height in 1..=length {
        let header = header_at(prev_hash, height, height as u32);
        let hash = header.hash();
        let mut node = BlockIndexNode::new(hash, Some(prev_hash), height, &header);
        if height % 3 == 0 {
            node.set_proof_of_stake(proof_hash_for(height));
        }
        index.insert(node);
        active.push(hash);
        connect_block_stake(&mut index, &hash, &params).expect("connect block");
        headers.push(header);
        prev_hash = hash;
    }

    TestChain {
        index,
        active,
        params,
        headers,
    }
}
