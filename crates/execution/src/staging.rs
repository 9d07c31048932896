//! Staged calls awaiting a batch.
//!
//! A staged call is read once by the batch executor and removed whether or
//! not it then executes successfully.

use crate::TxError;
use swapledger_engine::{StateCache, StateCacheExt, StorageError};
use swapledger_types::{KeyTag, PendingTransaction, StateKey, TxId};

/// Key of the staged call `tx_id` under `prefix`.
pub fn pending_key(prefix: &str, tx_id: &TxId) -> StateKey {
    StateKey::new(KeyTag::PendingTx, [prefix.to_string(), tx_id.to_hex()])
}

/// Store a call for a later batch.
pub fn stage(
    state: &mut dyn StateCache,
    prefix: &str,
    tx_id: &TxId,
    pending: &PendingTransaction,
) -> Result<(), TxError> {
    state.put_json(&pending_key(prefix, tx_id), pending)?;
    Ok(())
}

/// Load and remove a staged call.
///
/// The key is deleted before decoding, so a second `take` of the same id
/// always fails with [`TxError::StagingNotFound`].
pub fn take(
    state: &mut dyn StateCache,
    prefix: &str,
    tx_id: &TxId,
) -> Result<PendingTransaction, TxError> {
    let key = pending_key(prefix, tx_id);
    let raw = state.get_state(&key)?;
    state.delete_state(&key);

    let raw = raw.ok_or(TxError::StagingNotFound(*tx_id))?;
    Ok(serde_json::from_slice(&raw).map_err(StorageError::from)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swapledger_engine::{BatchCache, InMemoryWorldState};
    use swapledger_types::{Address, Hash};

    fn pending() -> PendingTransaction {
        PendingTransaction {
            method: "emit".to_string(),
            sender: Some(Address(Hash::from_bytes(b"alice"))),
            args: vec!["10".to_string()],
            caller_fingerprint: Hash::ZERO,
            timestamp: 1_700_000_000,
            nonce: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_take_consumes_staged_call() {
        let mut world = InMemoryWorldState::new();
        let mut batch = BatchCache::new(&mut world);
        let id = TxId::from_seed(b"tx");

        stage(&mut batch, "batchTransactions", &id, &pending()).unwrap();
        assert_eq!(take(&mut batch, "batchTransactions", &id).unwrap(), pending());
        assert_eq!(
            take(&mut batch, "batchTransactions", &id),
            Err(TxError::StagingNotFound(id))
        );
    }

    #[test]
    fn test_prefix_separates_staging_areas() {
        let mut world = InMemoryWorldState::new();
        let mut batch = BatchCache::new(&mut world);
        let id = TxId::from_seed(b"tx");

        stage(&mut batch, "a", &id, &pending()).unwrap();
        assert!(take(&mut batch, "b", &id).is_err());
        assert!(take(&mut batch, "a", &id).is_ok());
    }

    #[test]
    fn test_undecodable_call_is_still_removed() {
        let mut world = InMemoryWorldState::new();
        let mut batch = BatchCache::new(&mut world);
        let id = TxId::from_seed(b"tx");
        let key = pending_key("p", &id);
        batch.put_state(&key, b"not json".to_vec());

        assert!(matches!(take(&mut batch, "p", &id), Err(TxError::Storage(_))));
        assert_eq!(batch.get_state(&key).unwrap(), None);
    }
}
