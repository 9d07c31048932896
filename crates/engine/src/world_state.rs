//! World state accessor.
//!
//! The hosting ledger owns persistence and replica consistency; this module
//! only defines the ordered key-value contract the engine consumes, plus an
//! in-memory implementation used in tests and simulations.

use crate::StorageError;
use im::OrdMap;
use swapledger_types::WriteElement;

/// An ordered key-value store over encoded state keys.
///
/// Implementations must be deterministic: the same sequence of calls yields
/// the same results on every replica.
pub trait WorldState {
    /// Read the value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` under `key`.
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<(), StorageError>;

    /// Every entry whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    /// Apply `writes` as one unit.
    ///
    /// On error the store must be left exactly as it was: either every
    /// element lands or none does.
    fn apply(&mut self, writes: Vec<WriteElement>) -> Result<(), StorageError>;
}

/// In-memory world state backed by a persistent ordered map.
///
/// Cloning is O(1), which makes snapshots before a batch cheap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryWorldState {
    data: OrdMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryWorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Vec<u8>)> {
        self.data.iter()
    }
}

impl WorldState for InMemoryWorldState {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StorageError> {
        self.data.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StorageError> {
        self.data.remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn apply(&mut self, writes: Vec<WriteElement>) -> Result<(), StorageError> {
        let mut next = self.data.clone();
        for write in writes {
            if write.is_deleted {
                next.remove(&write.key);
            } else {
                next.insert(write.key, write.value);
            }
        }
        self.data = next;
        Ok(())
    }
}
