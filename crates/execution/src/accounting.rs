//! Per-transaction accounting of value movements.

use swapledger_types::{sort_accounting, AccountingRecord, Address, Amount};

/// Append-only list of value movements for one transaction.
///
/// Every balance primitive appends a record alongside its state mutation.
/// Records are sorted by their string form on [`AccountingRecorder::finish`]
/// so re-executing a transaction yields byte-identical output.
#[derive(Debug, Clone, Default)]
pub struct AccountingRecorder {
    records: Vec<AccountingRecord>,
}

impl AccountingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one movement.
    pub fn record(
        &mut self,
        token: impl Into<String>,
        sender: Address,
        recipient: Address,
        amount: Amount,
        reason: impl Into<String>,
    ) {
        self.records.push(AccountingRecord {
            token: token.into(),
            sender,
            recipient,
            amount,
            reason: reason.into(),
        });
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[AccountingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consume the recorder, returning records in canonical order.
    pub fn finish(self) -> Vec<AccountingRecord> {
        let mut records = self.records;
        sort_accounting(&mut records);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swapledger_types::Hash;

    #[test]
    fn test_finish_is_order_independent() {
        let alice = Address(Hash::from_bytes(b"alice"));
        let bob = Address(Hash::from_bytes(b"bob"));

        let mut first = AccountingRecorder::new();
        first.record("VT", alice, bob, Amount(5), "transfer");
        first.record("CC", Address::ZERO, alice, Amount(1), "mint");

        let mut second = AccountingRecorder::new();
        second.record("CC", Address::ZERO, alice, Amount(1), "mint");
        second.record("VT", alice, bob, Amount(5), "transfer");

        assert_eq!(first.len(), 2);
        assert_eq!(first.records()[0].token, "VT");
        assert_eq!(first.finish(), second.finish());
    }
}
