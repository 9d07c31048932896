//! Core types for the batch execution and atomic swap engine.
//!
//! This crate holds the data model shared by the cache layer and the
//! executor: hashes and identifiers, Ed25519 keys, structured state keys,
//! amounts, staged transactions, swap records and batch responses.

mod accounting;
mod amount;
mod crypto;
mod hash;
mod identifiers;
mod key;
mod response;
mod signing;
mod state;
mod swap;
mod transaction;

pub use accounting::{sort_accounting, AccountingRecord};
pub use amount::{Amount, AmountError};
pub use crypto::{verify_threshold, KeyPair, PublicKey, Signature, ThresholdError};
pub use hash::{Hash, HexError};
pub use identifiers::{Address, ContractId, SwapId, TxId};
pub use key::{KeyDecodeError, KeyTag, StateKey};
pub use response::{
    BatchEvent, BatchResponse, BatchTxEvent, ContractEvent, SwapResponse, TxResponse,
    BATCH_EVENT_NAME,
};
pub use signing::request_message;
pub use state::{NonceRecord, WriteElement};
pub use swap::{token_group, token_symbol, AssetAmount, SwapAssets, SwapKind, SwapRecord};
pub use transaction::{Batch, PendingTransaction, SwapKeyReveal};
