//! Batch execution results and emitted events.

use crate::{AccountingRecord, SwapId, SwapRecord, TxId, WriteElement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the event emitted once per executed batch.
pub const BATCH_EVENT_NAME: &str = "batchExecute";

/// Outcome of one staged transaction, as returned to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResponse {
    pub id: TxId,
    /// Empty when the staged call could not be loaded.
    pub method: String,
    pub error: Option<String>,
    /// Sorted by key; empty on failure.
    pub writes: Vec<WriteElement>,
}

/// Outcome of one staged transaction, as emitted in the batch event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTxEvent {
    pub id: TxId,
    pub method: String,
    pub error: Option<String>,
    pub result: Option<Vec<u8>>,
    /// Sorted by string form.
    pub accounting: Vec<AccountingRecord>,
    /// Named payloads set by the handler.
    pub events: BTreeMap<String, Vec<u8>>,
}

impl BatchTxEvent {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of one batch-embedded swap answer or secret reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResponse {
    pub id: SwapId,
    pub error: Option<String>,
    pub writes: Vec<WriteElement>,
}

/// Everything a batch produced, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub tx_responses: Vec<TxResponse>,
    pub swap_responses: Vec<SwapResponse>,
    pub swap_key_responses: Vec<SwapResponse>,
    pub created_swaps: Vec<SwapRecord>,
    pub created_multi_swaps: Vec<SwapRecord>,
}

/// Batch summary emitted under [`BATCH_EVENT_NAME`]: every transaction's
/// outcome plus the swaps opened by the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEvent {
    pub events: Vec<BatchTxEvent>,
    #[serde(default)]
    pub created_swaps: Vec<SwapRecord>,
    #[serde(default)]
    pub created_multi_swaps: Vec<SwapRecord>,
}

/// A named event set on the hosting ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub name: String,
    pub payload: Vec<u8>,
}

impl ContractEvent {
    pub fn new(name: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }
}
