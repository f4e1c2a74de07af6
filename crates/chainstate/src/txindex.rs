//! Transaction index mapping txids to their on-disk position.

use emberd_consensus::Hash256;
use emberd_storage::{Column, KeyValueStore, StoreError, WriteBatch};

use crate::flatfiles::FileLocation;

const TX_LOCATION_LEN: usize = 20;

/// Where a transaction lives: the block record plus the byte offset of the
/// transaction relative to the end of the block header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TxLocation {
    pub block: FileLocation,
    pub tx_offset: u32,
}

impl TxLocation {
    pub fn encode(&self) -> [u8; TX_LOCATION_LEN] {
        let mut out = [0u8; TX_LOCATION_LEN];
        out[0..16].copy_from_slice(&self.block.encode());
        out[16..20].copy_from_slice(&self.tx_offset.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != TX_LOCATION_LEN {
            return None;
        }
        let block = FileLocation::decode(&bytes[0..16])?;
        let tx_offset = u32::from_le_bytes(bytes[16..20].try_into().ok()?);
        Some(Self { block, tx_offset })
    }
}

pub struct TxIndex<S> {
    store: S,
}

impl<S> TxIndex<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: KeyValueStore> TxIndex<S> {
    pub fn insert(&self, batch: &mut WriteBatch, txid: &Hash256, location: TxLocation) {
        batch.put(Column::TxIndex, txid, location.encode());
    }

    pub fn delete(&self, batch: &mut WriteBatch, txid: &Hash256) {
        batch.delete(Column::TxIndex, txid);
    }

    pub fn get(&self, txid: &Hash256) -> Result<Option<TxLocation>, StoreError> {
        let bytes = match self.store.get(Column::TxIndex, txid)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        TxLocation::decode(&bytes)
            .ok_or_else(|| StoreError::Backend("invalid tx index entry".to_string()))
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emberd_storage::MemoryStore;

    #[test]
    fn insert_get_round_trip() {
        let index = TxIndex::new(MemoryStore::new());
        let txid = [0x33; 32];
        let location = TxLocation {
            block: FileLocation {
                file_id: 2,
                offset: 4096,
                len: 512,
            },
            tx_offset: 181,
        };

        let mut batch = WriteBatch::new();
        index.insert(&mut batch, &txid, location);
        index.store.write_batch(&batch).expect("batch");

        assert_eq!(index.get(&txid).expect("get"), Some(location));
        assert_eq!(index.get(&[0x44; 32]).expect("get"), None);
    }

    #[test]
    fn delete_removes_entry() {
        let index = TxIndex::new(MemoryStore::new());
        let txid = [0x55; 32];
        let location = TxLocation {
            block: FileLocation {
                file_id: 0,
                offset: 0,
                len: 100,
            },
            tx_offset: 81,
        };

        let mut batch = WriteBatch::new();
        index.insert(&mut batch, &txid, location);
        index.delete(&mut batch, &txid);
        index.store.write_batch(&batch).expect("batch");

        assert_eq!(index.get(&txid).expect("get"), None);
    }
}
