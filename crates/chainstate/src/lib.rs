//! Chain state: block index, flat block files, and the transaction index.

pub mod blockindex;
pub mod flatfiles;
pub mod timedata;
pub mod txindex;

pub use blockindex::{
    stake_entropy_bit, ActiveChain, BlockIndex, BlockIndexNode, BLOCK_PROOF_OF_STAKE,
    BLOCK_STAKE_ENTROPY, BLOCK_STAKE_MODIFIER,
};
pub use flatfiles::{FileLocation, FlatFileError, FlatFileStore};
pub use timedata::{FixedClock, NetworkClock, SystemClock};
pub use txindex::{TxIndex, TxLocation};
