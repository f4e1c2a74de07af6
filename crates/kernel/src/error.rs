//! Kernel error kinds.

use emberd_chainstate::FlatFileError;
use emberd_consensus::Hash256;
use emberd_primitives::encoding::DecodeError;
use emberd_storage::StoreError;

use crate::target::CompactError;

/// Hard rejection causes raised by the kernel. A stake that is merely not
/// yet verifiable (our chain is behind) is not an error; the resolver and
/// the hash check report it as an `Ok(None)` verdict so callers can defer.
#[derive(Debug)]
pub enum KernelError {
    BlockNotIndexed(Hash256),
    NoPriorModifier,
    SelectionFailure { round: u32 },
    ReachedBestBlock { height: i32 },
    TxIndexUnavailable,
    TxIndexMiss(Hash256),
    TxidMismatch { expected: Hash256, found: Hash256 },
    Deserialize(DecodeError),
    BlockFile(FlatFileError),
    Store(StoreError),
    NotCoinStake,
    BadTarget(CompactError),
    PrevoutOutOfRange { index: u32 },
    TimeViolation,
    MinAgeViolation,
    MinValueViolation,
    ScriptIdentityMismatch,
    HashAboveTarget,
    CheckpointMismatch { height: i32, checksum: u32 },
}

fn hash_hex(hash: &Hash256) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(64);
    for byte in hash.iter().rev() {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

impl std::fmt::Display for KernelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelError::BlockNotIndexed(hash) => {
                write!(f, "block not indexed: {}", hash_hex(hash))
            }
            KernelError::NoPriorModifier => write!(f, "unable to get last stake modifier"),
            KernelError::SelectionFailure { round } => {
                write!(f, "unable to select block at round {round}")
            }
            KernelError::ReachedBestBlock { height } => {
                write!(f, "reached best block at height {height} before modifier")
            }
            KernelError::TxIndexUnavailable => write!(f, "transaction index not available"),
            KernelError::TxIndexMiss(txid) => {
                write!(f, "tx index entry not found for {}", hash_hex(txid))
            }
            KernelError::TxidMismatch { expected, found } => write!(
                f,
                "txid mismatch: expected {}, found {}",
                hash_hex(expected),
                hash_hex(found)
            ),
            KernelError::Deserialize(err) => write!(f, "deserialize error: {err}"),
            KernelError::BlockFile(err) => write!(f, "block file error: {err}"),
            KernelError::Store(err) => write!(f, "storage error: {err}"),
            KernelError::NotCoinStake => write!(f, "second transaction is not a coinstake"),
            KernelError::BadTarget(err) => write!(f, "invalid compact target: {err}"),
            KernelError::PrevoutOutOfRange { index } => {
                write!(f, "prevout index {index} out of range")
            }
            KernelError::TimeViolation => write!(f, "stake timestamp violation"),
            KernelError::MinAgeViolation => write!(f, "stake min age violation"),
            KernelError::MinValueViolation => write!(f, "stake min amount violation"),
            KernelError::ScriptIdentityMismatch => {
                write!(f, "stake output does not pay the consumed key")
            }
            KernelError::HashAboveTarget => write!(f, "proof hash exceeds weighted target"),
            KernelError::CheckpointMismatch { height, checksum } => write!(
                f,
                "stake modifier checkpoint mismatch at height {height} (checksum 0x{checksum:08x})"
            ),
        }
    }
}

impl std::error::Error for KernelError {}

impl From<DecodeError> for KernelError {
    fn from(err: DecodeError) -> Self {
        KernelError::Deserialize(err)
    }
}

impl From<FlatFileError> for KernelError {
    fn from(err: FlatFileError) -> Self {
        KernelError::BlockFile(err)
    }
}

impl From<StoreError> for KernelError {
    fn from(err: StoreError) -> Self {
        KernelError::Store(err)
    }
}

impl From<CompactError> for KernelError {
    fn from(err: CompactError) -> Self {
        KernelError::BadTarget(err)
    }
}
