//! Error types for execution.
//!
//! Every per-transaction failure is a [`TxError`] recorded in that
//! transaction's response; only an [`ExecutionError`] aborts a whole batch.

use swapledger_engine::StorageError;
use swapledger_types::{Address, AmountError, Hash, TxId};
use thiserror::Error;

/// Nonce rejections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NonceError {
    /// Not a millisecond timestamp of the expected digit length.
    #[error("incorrect nonce format")]
    InvalidFormat { nonce: u64 },

    /// Strict mode: not greater than the stored nonce.
    #[error("incorrect nonce, current {current}")]
    NotIncreasing { current: u64 },

    /// Window mode: older than the window anchored at the newest marker.
    #[error("incorrect nonce {nonce}, less than {newest}")]
    OutOfWindow { nonce: u64, newest: u64 },

    /// Window mode: already accepted.
    #[error("nonce {nonce} already exists")]
    AlreadyExists { nonce: u64 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Balance primitive failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalanceError {
    #[error("insufficient funds to process")]
    Insufficient,

    #[error("amount overflow")]
    Overflow,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<AmountError> for BalanceError {
    fn from(err: AmountError) -> Self {
        match err {
            AmountError::Overflow => BalanceError::Overflow,
            AmountError::Insufficient => BalanceError::Insufficient,
            AmountError::Invalid(value) => {
                BalanceError::Storage(StorageError::Codec(format!("invalid balance {value}")))
            }
        }
    }
}

/// Swap protocol failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwapError {
    /// Self-swap, or a token that is neither side's asset.
    #[error("incorrect swap")]
    Incorrect,

    /// The revealed secret does not hash to the stored hash.
    #[error("incorrect key")]
    IncorrectKey,

    #[error("swap doesn't exist")]
    NotFound,

    /// Only the creator may cancel.
    #[error("unauthorized")]
    Unauthorized,

    #[error("wait for timeout to end")]
    NotExpired { timeout: u64, now: u64 },

    #[error("assets can't be empty")]
    EmptyAssets,

    #[error("swap timeout overflows: {now} + {window}")]
    TimeoutOverflow { now: u64, window: u64 },

    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Sender authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("incorrect number of arguments")]
    ArgumentCount,

    #[error("incorrect chaincode")]
    IncorrectContract,

    #[error("incorrect channel")]
    IncorrectChannel,

    #[error("should be signed")]
    NotSigned,

    #[error("incorrect number of keys or signs")]
    KeyCount,

    #[error("incorrect signature")]
    IncorrectSignature,

    #[error("signature policy isn't satisfied")]
    PolicyNotSatisfied,

    #[error("invalid key or signature encoding")]
    Encoding,

    #[error("address {0} is blacklisted")]
    Blacklisted(Address),

    #[error("address {0} is graylisted")]
    Graylisted(Address),

    #[error("invalid nonce {0:?}")]
    NonceFormat(String),

    #[error("incorrect nonce: {0}")]
    Nonce(#[from] NonceError),
}

/// Argument validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("incorrect number of arguments: expected {expected}, got {actual}")]
    Count { expected: usize, actual: usize },

    #[error("argument {index}: invalid {kind} value {value:?}")]
    Invalid {
        index: usize,
        kind: &'static str,
        value: String,
    },

    #[error("argument {index}: expected {expected}")]
    WrongKind { index: usize, expected: &'static str },
}

/// Error returned by an operation handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// Business-level failure.
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Args(#[from] ArgError),

    #[error(transparent)]
    Swap(#[from] SwapError),

    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error(transparent)]
    Nonce(#[from] NonceError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }
}

/// Per-transaction failure, recorded in the batch response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    /// No staged call under this id.
    #[error("transaction {0} not found")]
    StagingNotFound(TxId),

    #[error("transaction expired")]
    Expired { staged_at: u64, batch_ts: u64 },

    #[error("{0}")]
    ReplayRejected(NonceError),

    #[error("no sender in tx {0}")]
    NoSender(TxId),

    #[error("unknown method {0}")]
    UnknownOperation(String),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error("incorrect key")]
    IncorrectSecret,

    #[error("incorrect swap")]
    MalformedSwap,

    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A handler panicked; recovered at the transaction boundary.
    #[error("panic in {method}: {message}")]
    Panic { method: String, message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TxError {
    /// Whether the error happened while loading the staged call.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            TxError::StagingNotFound(_)
                | TxError::Expired { .. }
                | TxError::ReplayRejected(_)
                | TxError::NoSender(_)
        )
    }

    /// Text reported to clients.
    pub fn response_message(&self) -> String {
        if self.is_load_error() {
            format!("function and args loading error: {self}")
        } else {
            self.to_string()
        }
    }
}

impl From<SwapError> for TxError {
    fn from(err: SwapError) -> Self {
        match err {
            SwapError::IncorrectKey => TxError::IncorrectSecret,
            SwapError::Incorrect => TxError::MalformedSwap,
            SwapError::Unauthorized => TxError::Unauthorized,
            SwapError::Storage(err) => TxError::Storage(err),
            other => TxError::Handler(HandlerError::Swap(other)),
        }
    }
}

/// Configuration rejected by [`crate::ContractConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(String),

    #[error("contract id must not be empty")]
    EmptyContractId,

    #[error("batch prefix must not be empty")]
    EmptyBatchPrefix,

    #[error("responder timeout {responder}s exceeds user-side timeout {user_side}s")]
    TimeoutOrder { responder: u64, user_side: u64 },

    #[error("batch submitter must be configured")]
    MissingSubmitter,
}

/// Batch-level failures. These abort the whole batch response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("unauthorized batch submitter {0}")]
    UnauthorizedSubmitter(Hash),

    #[error("no batch submitter configured")]
    NoSubmitter,

    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    #[error("batch commit failed: {0}")]
    Commit(StorageError),

    #[error("could not encode batch output: {0}")]
    Encode(String),
}

/// Errors returned by [`crate::Contract::invoke`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("unknown method {0}")]
    UnknownFunction(String),

    #[error("{0}")]
    Disabled(&'static str),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Tx(#[from] TxError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<AuthError> for ContractError {
    fn from(err: AuthError) -> Self {
        ContractError::Tx(TxError::Auth(err))
    }
}

impl From<HandlerError> for ContractError {
    fn from(err: HandlerError) -> Self {
        ContractError::Tx(TxError::Handler(err))
    }
}

impl From<SwapError> for ContractError {
    fn from(err: SwapError) -> Self {
        ContractError::Tx(TxError::from(err))
    }
}

impl From<ArgError> for ContractError {
    fn from(err: ArgError) -> Self {
        ContractError::Tx(TxError::Handler(HandlerError::Args(err)))
    }
}
