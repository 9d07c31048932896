//! Staged calls and the batches that consume them.

use crate::{Address, Hash, SwapId, SwapRecord, TxId};
use serde::{Deserialize, Serialize};

/// A client call accepted and staged for the next batch.
///
/// Read exactly once by the batch executor and deleted from staged storage
/// regardless of the execution outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub method: String,
    /// Authenticated sender, for operations that need authorization.
    pub sender: Option<Address>,
    pub args: Vec<String>,
    /// Fingerprint of the identity that submitted the staging call.
    pub caller_fingerprint: Hash,
    /// Staging time, in seconds.
    pub timestamp: u64,
    pub nonce: u64,
}

/// Secret revealed for a swap the contract answered earlier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapKeyReveal {
    pub id: SwapId,
    pub key: String,
}

/// A group of staged transactions committed together.
///
/// Constructed by the submitter and consumed in one executor pass; never
/// persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub tx_ids: Vec<TxId>,
    #[serde(default)]
    pub swaps: Vec<SwapRecord>,
    #[serde(default)]
    pub keys: Vec<SwapKeyReveal>,
    #[serde(default)]
    pub multi_swaps: Vec<SwapRecord>,
    #[serde(default)]
    pub multi_swap_keys: Vec<SwapKeyReveal>,
}

impl Batch {
    pub fn new(tx_ids: Vec<TxId>) -> Self {
        Self {
            tx_ids,
            ..Default::default()
        }
    }

    pub fn with_swap(mut self, swap: SwapRecord) -> Self {
        self.swaps.push(swap);
        self
    }

    pub fn with_key(mut self, id: SwapId, key: impl Into<String>) -> Self {
        self.keys.push(SwapKeyReveal {
            id,
            key: key.into(),
        });
        self
    }

    pub fn with_multi_swap(mut self, swap: SwapRecord) -> Self {
        self.multi_swaps.push(swap);
        self
    }

    pub fn with_multi_swap_key(mut self, id: SwapId, key: impl Into<String>) -> Self {
        self.multi_swap_keys.push(SwapKeyReveal {
            id,
            key: key.into(),
        });
        self
    }

    /// Encode for submission.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_json_defaults_swap_lists() {
        let id = TxId::from_seed(b"tx");
        let json = format!(r#"{{"tx_ids":["{}"]}}"#, id.to_hex());
        let batch = Batch::from_json(&json).unwrap();
        assert_eq!(batch, Batch::new(vec![id]));
    }

    #[test]
    fn test_batch_builder_keeps_order() {
        let a = TxId::from_seed(b"a");
        let b = TxId::from_seed(b"b");
        let batch = Batch::new(vec![a, b]).with_key(a, "k1").with_key(b, "k2");
        assert_eq!(batch.tx_ids, vec![a, b]);
        assert_eq!(batch.keys[0].key, "k1");
        assert_eq!(batch.keys[1].id, b);
    }
}
