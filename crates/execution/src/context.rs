//! Execution context handed to operation handlers.

use crate::AccountingRecorder;
use std::collections::BTreeMap;
use swapledger_engine::{StateCache, TxCache};
use swapledger_types::{
    AccountingRecord, Address, Amount, ContractId, Hash, SwapKind, SwapRecord, TxId, WriteElement,
};

/// Everything a successful transaction produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxEffects {
    pub result: Option<Vec<u8>>,
    /// Sorted by key.
    pub writes: Vec<WriteElement>,
    pub events: BTreeMap<String, Vec<u8>>,
    /// Sorted by string form.
    pub accounting: Vec<AccountingRecord>,
    pub created_swaps: Vec<SwapRecord>,
    pub created_multi_swaps: Vec<SwapRecord>,
}

/// One transaction's view of the state plus its side outputs.
///
/// Writes go to a private [`TxCache`]. [`TxContext::finish`] folds them into
/// the enclosing cache; dropping the context discards them together with
/// events, accounting and created swaps.
pub struct TxContext<'c> {
    cache: TxCache<'c>,
    tx_id: TxId,
    timestamp: u64,
    caller: Hash,
    contract_id: ContractId,
    accounting: AccountingRecorder,
    events: BTreeMap<String, Vec<u8>>,
    created_swaps: Vec<SwapRecord>,
    created_multi_swaps: Vec<SwapRecord>,
}

impl<'c> TxContext<'c> {
    pub fn new(
        parent: &'c mut dyn StateCache,
        tx_id: TxId,
        timestamp: u64,
        caller: Hash,
        contract_id: ContractId,
    ) -> Self {
        Self {
            cache: TxCache::new(parent),
            tx_id,
            timestamp,
            caller,
            contract_id,
            accounting: AccountingRecorder::new(),
            events: BTreeMap::new(),
            created_swaps: Vec::new(),
            created_multi_swaps: Vec::new(),
        }
    }

    pub fn state(&self) -> &dyn StateCache {
        &self.cache
    }

    pub fn state_mut(&mut self) -> &mut dyn StateCache {
        &mut self.cache
    }

    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    /// Timestamp of the enclosing batch or call, in seconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Fingerprint of the identity that submitted the call.
    pub fn caller(&self) -> Hash {
        self.caller
    }

    pub fn contract_id(&self) -> &ContractId {
        &self.contract_id
    }

    /// Set a named event payload; a later call with the same name replaces it.
    pub fn set_event(&mut self, name: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.events.insert(name.into(), payload.into());
    }

    pub fn events(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.events
    }

    pub fn record_accounting(
        &mut self,
        token: impl Into<String>,
        sender: Address,
        recipient: Address,
        amount: Amount,
        reason: impl Into<String>,
    ) {
        self.accounting
            .record(token, sender, recipient, amount, reason);
    }

    pub fn accounting(&self) -> &AccountingRecorder {
        &self.accounting
    }

    pub(crate) fn push_created_swap(&mut self, swap: SwapRecord) {
        match swap.kind() {
            SwapKind::Single => self.created_swaps.push(swap),
            SwapKind::Multi => self.created_multi_swaps.push(swap),
        }
    }

    /// Commit the buffered writes into the enclosing cache.
    pub fn finish(self, result: Option<Vec<u8>>) -> TxEffects {
        TxEffects {
            result,
            writes: self.cache.commit(),
            events: self.events,
            accounting: self.accounting.finish(),
            created_swaps: self.created_swaps,
            created_multi_swaps: self.created_multi_swaps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swapledger_engine::{BatchCache, InMemoryWorldState};

    fn context<'c>(parent: &'c mut dyn StateCache) -> TxContext<'c> {
        TxContext::new(
            parent,
            TxId::from_seed(b"tx"),
            1_700_000_000,
            Hash::from_bytes(b"caller"),
            ContractId::new("VT"),
        )
    }

    #[test]
    fn test_finish_commits_into_parent() {
        let mut world = InMemoryWorldState::new();
        let mut batch = BatchCache::new(&mut world);

        let mut ctx = context(&mut batch);
        ctx.state_mut().put(b"k".to_vec(), b"v".to_vec());
        ctx.set_event("e", b"1".to_vec());
        ctx.set_event("e", b"2".to_vec());
        let effects = ctx.finish(Some(b"ok".to_vec()));

        assert_eq!(effects.writes.len(), 1);
        assert_eq!(effects.events.get("e"), Some(&b"2".to_vec()));
        assert_eq!(batch.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_drop_discards_everything() {
        let mut world = InMemoryWorldState::new();
        let mut batch = BatchCache::new(&mut world);
        {
            let mut ctx = context(&mut batch);
            ctx.state_mut().put(b"k".to_vec(), b"v".to_vec());
            ctx.record_accounting("VT", Address::ZERO, Address::ZERO, Amount(1), "x");
        }
        assert_eq!(batch.get(b"k").unwrap(), None);
    }
}
