//! Deterministic batch execution and hash-locked swaps.
//!
//! This crate implements the execution layer of one contract as a pure,
//! synchronous state machine over a [`swapledger_engine::WorldState`]. It
//! handles:
//!
//! - Staging of authorized client calls
//! - Replay protection with per-sender nonce records
//! - Batch execution with per-transaction isolation
//! - Single- and multi-asset atomic swaps between contracts
//! - Accounting of every balance movement

mod accounting;
pub mod auth;
mod balances;
mod config;
mod context;
mod contract;
mod error;
mod executor;
mod nonce;
mod registry;
pub mod staging;
mod swap;

pub use accounting::AccountingRecorder;
pub use auth::{AccessControl, AclEntry, SignedRequest, StaticAccessControl};
pub use balances::{balance_get, balance_list};
pub use config::{
    ContractConfig, DEFAULT_BATCH_PREFIX, DEFAULT_RESPONDER_TIMEOUT_SECS,
    DEFAULT_USER_SIDE_TIMEOUT_SECS,
};
pub use context::{TxContext, TxEffects};
pub use contract::{
    Contract, InvokeResponse, Invocation, BATCH_EXECUTE, MULTI_SWAP_DONE, SWAP_DONE,
};
pub use error::{
    ArgError, AuthError, BalanceError, ConfigError, ContractError, ExecutionError, HandlerError,
    NonceError, SwapError, TxError,
};
pub use executor::{BatchExecutor, BatchInvocation, BatchOutcome, TxOutcome};
pub use nonce::{admit, NonceLedger, NONCE_DIGITS};
pub use registry::{
    ArgKind, ArgValue, Args, Handler, Operation, OperationKind, OperationRegistry,
    OperationRegistryBuilder,
};
pub use swap::{MultiSwapAssets, SwapCoordinator, MULTI_SWAP_KEY_EVENT, SWAP_KEY_EVENT};
