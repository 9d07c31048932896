//! Two-level write cache.
//!
//! A [`BatchCache`] wraps the world state for the duration of one batch and a
//! [`TxCache`] wraps the batch cache (or any other [`StateCache`]) for one
//! transaction. Reads check the local buffer first and fall through to the
//! enclosing scope; writes and deletes are only buffered. Visibility is
//! strictly hierarchical: transaction → batch → world state.
//!
//! # Example
//!
//! ```
//! use swapledger_engine::{BatchCache, InMemoryWorldState, StateCache, TxCache, WorldState};
//!
//! let mut world = InMemoryWorldState::new();
//! let mut batch = BatchCache::new(&mut world);
//!
//! let mut tx = TxCache::new(&mut batch);
//! tx.put(b"k".to_vec(), b"v".to_vec());
//! let writes = tx.commit();
//! assert_eq!(writes.len(), 1);
//!
//! batch.commit().unwrap();
//! assert_eq!(world.get(b"k").unwrap(), Some(b"v".to_vec()));
//! ```

use crate::{StorageError, WorldState};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use swapledger_types::{StateKey, WriteElement};

/// Buffered entries of one cache scope. `None` marks a tombstone.
type Buffer = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// Read/write view shared by both cache scopes.
pub trait StateCache {
    /// Read `key`, falling through to the enclosing scope on a miss.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Buffer a write.
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>);

    /// Buffer a delete.
    fn delete(&mut self, key: Vec<u8>);

    /// Live entries under `prefix`, merging buffered writes over the enclosing
    /// scope, in ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;
}

/// Typed helpers over structured keys and JSON values.
pub trait StateCacheExt: StateCache {
    fn get_state(&self, key: &StateKey) -> Result<Option<Vec<u8>>, StorageError> {
        self.get(&key.encode())
    }

    fn put_state(&mut self, key: &StateKey, value: Vec<u8>) {
        self.put(key.encode(), value);
    }

    fn delete_state(&mut self, key: &StateKey) {
        self.delete(key.encode());
    }

    fn get_json<T: DeserializeOwned>(&self, key: &StateKey) -> Result<Option<T>, StorageError> {
        match self.get_state(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&mut self, key: &StateKey, value: &T) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(value)?;
        self.put_state(key, bytes);
        Ok(())
    }
}

impl<C: StateCache + ?Sized> StateCacheExt for C {}

fn merge_scan(
    below: Vec<(Vec<u8>, Vec<u8>)>,
    buffer: &Buffer,
    prefix: &[u8],
) -> Vec<(Vec<u8>, Vec<u8>)> {
    let overlay: Vec<_> = buffer
        .range(prefix.to_vec()..)
        .take_while(|(key, _)| key.starts_with(prefix))
        .collect();
    if overlay.is_empty() {
        return below;
    }

    let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = below.into_iter().collect();
    for (key, value) in overlay {
        match value {
            Some(value) => {
                merged.insert(key.clone(), value.clone());
            }
            None => {
                merged.remove(key);
            }
        }
    }
    merged.into_iter().collect()
}

fn buffered_elements(buffer: &Buffer) -> Vec<WriteElement> {
    buffer
        .iter()
        .map(|(key, value)| match value {
            Some(value) => WriteElement::put(key.clone(), value.clone()),
            None => WriteElement::delete(key.clone()),
        })
        .collect()
}

/// Batch-scoped cache over the world state.
///
/// Nothing reaches the world state until [`BatchCache::commit`]; dropping the
/// cache discards every buffered write.
pub struct BatchCache<'w> {
    base: &'w mut dyn WorldState,
    writes: Buffer,
}

impl<'w> BatchCache<'w> {
    pub fn new(base: &'w mut dyn WorldState) -> Self {
        Self {
            base,
            writes: BTreeMap::new(),
        }
    }

    /// Buffered writes, sorted by key.
    pub fn pending_writes(&self) -> Vec<WriteElement> {
        buffered_elements(&self.writes)
    }

    /// Flush every buffered entry to the world state in one
    /// [`WorldState::apply`].
    ///
    /// Puts for live values, deletes for tombstones, in key order. A failed
    /// flush leaves the world state untouched. Returns the number of flushed
    /// entries.
    pub fn commit(self) -> Result<usize, StorageError> {
        let elements = buffered_elements(&self.writes);
        let count = elements.len();
        self.base.apply(elements)?;
        tracing::debug!(writes = count, "Batch cache committed");
        Ok(count)
    }
}

impl StateCache for BatchCache<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        match self.writes.get(key) {
            Some(value) => Ok(value.clone()),
            None => self.base.get(key),
        }
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.writes.insert(key, None);
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let below = self.base.scan_prefix(prefix)?;
        Ok(merge_scan(below, &self.writes, prefix))
    }
}

/// Transaction-scoped cache over an enclosing cache.
///
/// [`TxCache::commit`] folds the buffer into the parent; dropping the cache
/// without committing discards it, so a failed transaction leaves no trace.
pub struct TxCache<'p> {
    parent: &'p mut dyn StateCache,
    writes: Buffer,
}

impl<'p> TxCache<'p> {
    pub fn new(parent: &'p mut dyn StateCache) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered entries.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Fold the buffer into the parent and return it sorted by key.
    pub fn commit(self) -> Vec<WriteElement> {
        let elements = buffered_elements(&self.writes);
        for (key, value) in self.writes {
            match value {
                Some(value) => self.parent.put(key, value),
                None => self.parent.delete(key),
            }
        }
        elements
    }
}

impl StateCache for TxCache<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        match self.writes.get(key) {
            Some(value) => Ok(value.clone()),
            None => self.parent.get(key),
        }
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.writes.insert(key, None);
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let below = self.parent.scan_prefix(prefix)?;
        Ok(merge_scan(below, &self.writes, prefix))
    }
}
