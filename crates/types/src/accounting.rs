//! Value-movement audit records.

use crate::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One value movement, independent of the world-state key layout.
///
/// Mint and burn use [`Address::ZERO`] for the missing side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingRecord {
    pub token: String,
    pub sender: Address,
    pub recipient: Address,
    pub amount: Amount,
    pub reason: String,
}

/// Canonical string form; records are sorted by it before emission.
impl fmt::Display for AccountingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "token:{} sender:{} recipient:{} amount:{} reason:{}",
            self.token, self.sender, self.recipient, self.amount, self.reason
        )
    }
}

/// Sort records by their string form.
pub fn sort_accounting(records: &mut [AccountingRecord]) {
    records.sort_by_cached_key(|record| record.to_string());
}
