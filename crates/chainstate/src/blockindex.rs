//! In-memory block index and the active-chain view.

use std::collections::HashMap;

use emberd_consensus::Hash256;
use emberd_primitives::block::BlockHeader;

// Stake flag bits. The checksum hashes the raw flag word, so these
// positions are frozen; do not reorder.
pub const BLOCK_PROOF_OF_STAKE: u32 = 1 << 0;
pub const BLOCK_STAKE_ENTROPY: u32 = 1 << 1;
pub const BLOCK_STAKE_MODIFIER: u32 = 1 << 2;

/// Derives a block's stake entropy bit: the parity of its hash.
pub fn stake_entropy_bit(hash: &Hash256) -> u64 {
    (hash[0] & 1) as u64
}

/// In-memory record for one known block. The index owns the node; the
/// parent link is the parent's hash, resolved through the arena.
#[derive(Clone, Debug)]
pub struct BlockIndexNode {
    pub hash: Hash256,
    pub prev: Option<Hash256>,
    pub height: i32,
    pub time: u32,
    pub bits: u32,
    pub flags: u32,
    pub stake_modifier: u64,
    /// Zero on proof-of-work blocks.
    pub hash_proof_of_stake: Hash256,
    pub stake_modifier_checksum: u32,
}

impl BlockIndexNode {
    pub fn new(hash: Hash256, prev: Option<Hash256>, height: i32, header: &BlockHeader) -> Self {
        let mut node = Self {
            hash,
            prev,
            height,
            time: header.time,
            bits: header.bits,
            flags: 0,
            stake_modifier: 0,
            hash_proof_of_stake: [0u8; 32],
            stake_modifier_checksum: 0,
        };
        node.set_stake_entropy_bit(stake_entropy_bit(&hash));
        node
    }

    pub fn block_time(&self) -> i64 {
        self.time as i64
    }

    pub fn is_proof_of_stake(&self) -> bool {
        (self.flags & BLOCK_PROOF_OF_STAKE) != 0
    }

    pub fn generated_stake_modifier(&self) -> bool {
        (self.flags & BLOCK_STAKE_MODIFIER) != 0
    }

    pub fn stake_entropy_bit(&self) -> u64 {
        ((self.flags & BLOCK_STAKE_ENTROPY) >> 1) as u64
    }

    pub fn set_proof_of_stake(&mut self, hash_proof_of_stake: Hash256) {
        self.flags |= BLOCK_PROOF_OF_STAKE;
        self.hash_proof_of_stake = hash_proof_of_stake;
    }

    pub fn set_stake_entropy_bit(&mut self, bit: u64) {
        if bit != 0 {
            self.flags |= BLOCK_STAKE_ENTROPY;
        } else {
            self.flags &= !BLOCK_STAKE_ENTROPY;
        }
    }

    pub fn set_stake_modifier(&mut self, modifier: u64, generated: bool) {
        self.stake_modifier = modifier;
        if generated {
            self.flags |= BLOCK_STAKE_MODIFIER;
        }
    }
}

/// Arena of index nodes keyed by block hash.
#[derive(Default)]
pub struct BlockIndex {
    nodes: HashMap<Hash256, BlockIndexNode>,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: BlockIndexNode) {
        self.nodes.insert(node.hash, node);
    }

    pub fn get(&self, hash: &Hash256) -> Option<&BlockIndexNode> {
        self.nodes.get(hash)
    }

    pub fn get_mut(&mut self, hash: &Hash256) -> Option<&mut BlockIndexNode> {
        self.nodes.get_mut(hash)
    }

    pub fn contains(&self, hash: &Hash256) -> bool {
        self.nodes.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn prev_of<'a>(&'a self, node: &BlockIndexNode) -> Option<&'a BlockIndexNode> {
        node.prev.as_ref().and_then(|hash| self.get(hash))
    }
}

/// The sequence of block hashes currently believed to be the best chain,
/// indexed by height.
#[derive(Default)]
pub struct ActiveChain {
    hashes: Vec<Hash256>,
}

impl ActiveChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hash: Hash256) {
        self.hashes.push(hash);
    }

    /// Drops every hash above `height`.
    pub fn truncate_to(&mut self, height: i32) {
        let keep = (height.max(-1) + 1) as usize;
        self.hashes.truncate(keep);
    }

    pub fn height(&self) -> i32 {
        self.hashes.len() as i32 - 1
    }

    pub fn at(&self, height: i32) -> Option<&Hash256> {
        if height < 0 {
            return None;
        }
        self.hashes.get(height as usize)
    }

    pub fn tip(&self) -> Option<&Hash256> {
        self.hashes.last()
    }

    pub fn contains(&self, node: &BlockIndexNode) -> bool {
        self.at(node.height) == Some(&node.hash)
    }

    /// The hash of the active-chain successor of `node`, if `node` is on
    /// the active chain and not its tip.
    pub fn next_after(&self, node: &BlockIndexNode) -> Option<&Hash256> {
        if !self.contains(node) {
            return None;
        }
        self.at(node.height + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn entropy_bit_follows_hash_parity() {
        let even = BlockIndexNode::new([0x02; 32], None, 0, &header(1_000));
        assert_eq!(even.stake_entropy_bit(), 0);
        assert_eq!(even.flags & BLOCK_STAKE_ENTROPY, 0);

        let odd = BlockIndexNode::new([0x03; 32], None, 0, &header(1_000));
        assert_eq!(odd.stake_entropy_bit(), 1);
        assert_ne!(odd.flags & BLOCK_STAKE_ENTROPY, 0);
    }

    #[test]
    fn modifier_flag_only_set_when_generated() {
        let mut node = BlockIndexNode::new([0x02; 32], None, 0, &header(1_000));
        node.set_stake_modifier(7, false);
        assert!(!node.generated_stake_modifier());
        assert_eq!(node.stake_modifier, 7);

        node.set_stake_modifier(9, true);
        assert!(node.generated_stake_modifier());
        assert_eq!(node.stake_modifier, 9);
    }

    #[test]
    fn active_chain_membership_and_successor() {
        let mut index = BlockIndex::new();
        let mut chain = ActiveChain::new();

        let genesis = BlockIndexNode::new([0x02; 32], None, 0, &header(1_000));
        let child = BlockIndexNode::new([0x04; 32], Some(genesis.hash), 1, &header(1_060));
        let orphan = BlockIndexNode::new([0x06; 32], Some(genesis.hash), 1, &header(1_060));

        chain.push(genesis.hash);
        chain.push(child.hash);
        index.insert(genesis.clone());
        index.insert(child.clone());
        index.insert(orphan.clone());

        assert!(chain.contains(&genesis));
        assert!(chain.contains(&child));
        assert!(!chain.contains(&orphan));

        assert_eq!(chain.next_after(&genesis), Some(&child.hash));
        assert_eq!(chain.next_after(&child), None);
        assert_eq!(chain.next_after(&orphan), None);

        assert_eq!(chain.height(), 1);
        chain.truncate_to(0);
        assert_eq!(chain.height(), 0);
        assert_eq!(chain.tip(), Some(&genesis.hash));
    }
}
