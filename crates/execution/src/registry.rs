//! Explicit operation registry.
//!
//! Each supported operation is registered once at startup with its name,
//! kind, declared argument shapes, authorization flag and handler. Raw string
//! arguments are validated against the declared shapes before a handler runs.
//!
//! # Example
//!
//! ```
//! use swapledger_execution::{ArgKind, ContractConfig, OperationRegistry};
//!
//! let config = ContractConfig::new("VT");
//! let registry = OperationRegistry::builder()
//!     .tx("emit", &[ArgKind::Amount], |ctx, sender, args| {
//!         let sender = sender.copied().unwrap_or_default();
//!         ctx.token_balance_add(&sender, args.amount(0)?, "emit")?;
//!         Ok(None)
//!     })
//!     .with_swap_operations(&config)
//!     .build(&config);
//!
//! assert!(registry.resolve("emit").is_some());
//! assert!(registry.resolve("swapBegin").is_some());
//! ```

use crate::swap::{swap_operations, SwapCoordinator};
use crate::{ArgError, ContractConfig, HandlerError, NonceLedger, TxContext};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use swapledger_types::{Address, Amount, Hash, SwapKind};

/// How an operation is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Staged, then executed by a later batch.
    Tx,
    /// Executed immediately; writes are committed.
    NoBatch,
    /// Executed immediately; read only.
    Query,
}

/// Declared shape of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    String,
    /// Decimal, non-negative.
    Amount,
    /// Hex-encoded address.
    Address,
    /// Hex-encoded bytes.
    Hex,
    U64,
    Json,
}

impl ArgKind {
    fn name(self) -> &'static str {
        match self {
            ArgKind::String => "string",
            ArgKind::Amount => "amount",
            ArgKind::Address => "address",
            ArgKind::Hex => "hex",
            ArgKind::U64 => "u64",
            ArgKind::Json => "json",
        }
    }

    fn parse(self, index: usize, raw: &str) -> Result<ArgValue, ArgError> {
        let invalid = || ArgError::Invalid {
            index,
            kind: self.name(),
            value: raw.to_string(),
        };
        Ok(match self {
            ArgKind::String => ArgValue::String(raw.to_string()),
            ArgKind::Amount => ArgValue::Amount(raw.parse().map_err(|_| invalid())?),
            ArgKind::Address => ArgValue::Address(Address::from_hex(raw).map_err(|_| invalid())?),
            ArgKind::Hex => ArgValue::Hex(hex::decode(raw).map_err(|_| invalid())?),
            ArgKind::U64 => ArgValue::U64(raw.parse().map_err(|_| invalid())?),
            ArgKind::Json => ArgValue::Json(serde_json::from_str(raw).map_err(|_| invalid())?),
        })
    }
}

/// A validated argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Amount(Amount),
    Address(Address),
    Hex(Vec<u8>),
    U64(u64),
    Json(serde_json::Value),
}

/// Validated arguments of one call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Args(Vec<ArgValue>);

impl Args {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn get(&self, index: usize) -> Result<&ArgValue, ArgError> {
        self.0.get(index).ok_or(ArgError::Count {
            expected: index + 1,
            actual: self.0.len(),
        })
    }

    pub fn string(&self, index: usize) -> Result<&str, ArgError> {
        match self.get(index)? {
            ArgValue::String(value) => Ok(value),
            _ => Err(ArgError::WrongKind {
                index,
                expected: "string",
            }),
        }
    }

    pub fn amount(&self, index: usize) -> Result<Amount, ArgError> {
        match self.get(index)? {
            ArgValue::Amount(value) => Ok(*value),
            _ => Err(ArgError::WrongKind {
                index,
                expected: "amount",
            }),
        }
    }

    pub fn address(&self, index: usize) -> Result<Address, ArgError> {
        match self.get(index)? {
            ArgValue::Address(value) => Ok(*value),
            _ => Err(ArgError::WrongKind {
                index,
                expected: "address",
            }),
        }
    }

    pub fn hex(&self, index: usize) -> Result<&[u8], ArgError> {
        match self.get(index)? {
            ArgValue::Hex(value) => Ok(value),
            _ => Err(ArgError::WrongKind {
                index,
                expected: "hex",
            }),
        }
    }

    /// A hex argument holding exactly one 32-byte hash.
    pub fn hash(&self, index: usize) -> Result<Hash, ArgError> {
        let bytes = self.hex(index)?;
        Hash::from_hash_bytes(bytes).map_err(|_| ArgError::Invalid {
            index,
            kind: "hash",
            value: hex::encode(bytes),
        })
    }

    pub fn u64(&self, index: usize) -> Result<u64, ArgError> {
        match self.get(index)? {
            ArgValue::U64(value) => Ok(*value),
            _ => Err(ArgError::WrongKind {
                index,
                expected: "u64",
            }),
        }
    }

    pub fn json<T: DeserializeOwned>(&self, index: usize) -> Result<T, ArgError> {
        match self.get(index)? {
            ArgValue::Json(value) => {
                serde_json::from_value(value.clone()).map_err(|_| ArgError::Invalid {
                    index,
                    kind: "json",
                    value: value.to_string(),
                })
            }
            _ => Err(ArgError::WrongKind {
                index,
                expected: "json",
            }),
        }
    }
}

/// Operation handler: context, authenticated sender (if any), arguments.
pub type Handler = Box<
    dyn Fn(&mut TxContext<'_>, Option<&Address>, &Args) -> Result<Option<Vec<u8>>, HandlerError>
        + Send
        + Sync,
>;

/// A registered operation.
pub struct Operation {
    name: String,
    kind: OperationKind,
    args: Vec<ArgKind>,
    needs_auth: bool,
    handler: Handler,
}

impl Operation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn arg_kinds(&self) -> &[ArgKind] {
        &self.args
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn needs_auth(&self) -> bool {
        self.needs_auth
    }

    /// Validate raw arguments against the declared shapes.
    pub fn parse_args(&self, raw: &[String]) -> Result<Args, ArgError> {
        if raw.len() != self.args.len() {
            return Err(ArgError::Count {
                expected: self.args.len(),
                actual: raw.len(),
            });
        }
        self.args
            .iter()
            .zip(raw)
            .enumerate()
            .map(|(index, (kind, value))| kind.parse(index, value))
            .collect::<Result<Vec<_>, _>>()
            .map(Args)
    }

    /// Run the handler.
    pub fn call(
        &self,
        ctx: &mut TxContext<'_>,
        sender: Option<&Address>,
        args: &Args,
    ) -> Result<Option<Vec<u8>>, HandlerError> {
        (self.handler)(ctx, sender, args)
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("args", &self.args)
            .field("needs_auth", &self.needs_auth)
            .finish()
    }
}

/// Name → operation mapping, in registration order.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: IndexMap<String, Operation>,
}

impl OperationRegistry {
    pub fn builder() -> OperationRegistryBuilder {
        OperationRegistryBuilder::default()
    }

    /// Look up an operation by name.
    pub fn resolve(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Builder for [`OperationRegistry`].
#[derive(Default)]
pub struct OperationRegistryBuilder {
    operations: IndexMap<String, Operation>,
}

impl OperationRegistryBuilder {
    /// Register an operation. A later registration under the same name
    /// replaces the earlier one.
    pub fn operation<F>(
        mut self,
        name: &str,
        kind: OperationKind,
        args: &[ArgKind],
        needs_auth: bool,
        handler: F,
    ) -> Self
    where
        F: Fn(&mut TxContext<'_>, Option<&Address>, &Args) -> Result<Option<Vec<u8>>, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.operations.insert(
            name.to_string(),
            Operation {
                name: name.to_string(),
                kind,
                args: args.to_vec(),
                needs_auth,
                handler: Box::new(handler),
            },
        );
        self
    }

    /// Register a signed, batched operation.
    pub fn tx<F>(self, name: &str, args: &[ArgKind], handler: F) -> Self
    where
        F: Fn(&mut TxContext<'_>, Option<&Address>, &Args) -> Result<Option<Vec<u8>>, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.operation(name, OperationKind::Tx, args, true, handler)
    }

    /// Register an unsigned, read-only operation.
    pub fn query<F>(self, name: &str, args: &[ArgKind], handler: F) -> Self
    where
        F: Fn(&mut TxContext<'_>, Option<&Address>, &Args) -> Result<Option<Vec<u8>>, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.operation(name, OperationKind::Query, args, false, handler)
    }

    /// Register a signed operation executed immediately.
    pub fn no_batch<F>(self, name: &str, args: &[ArgKind], handler: F) -> Self
    where
        F: Fn(&mut TxContext<'_>, Option<&Address>, &Args) -> Result<Option<Vec<u8>>, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.operation(name, OperationKind::NoBatch, args, true, handler)
    }

    /// Register the built-in swap operations and `getNonce`.
    ///
    /// Single- or multi-asset operations are skipped when disabled in
    /// `config`.
    pub fn with_swap_operations(mut self, config: &ContractConfig) -> Self {
        if !config.disable_swaps {
            self = swap_operations(self, SwapCoordinator::new(SwapKind::Single, config));
        }
        if !config.disable_multi_swaps {
            self = swap_operations(self, SwapCoordinator::new(SwapKind::Multi, config));
        }

        let nonces = NonceLedger::from_config(config);
        self.query("getNonce", &[ArgKind::Address], move |ctx, _, args| {
            let newest = nonces.newest(ctx.state(), &args.address(0)?)?;
            Ok(Some(newest.to_string().into_bytes()))
        })
    }

    /// Finish, dropping operations disabled in `config`.
    pub fn build(mut self, config: &ContractConfig) -> OperationRegistry {
        for name in &config.disabled_operations {
            if self.operations.shift_remove(name).is_some() {
                tracing::debug!(operation = %name, "Operation disabled");
            }
        }
        OperationRegistry {
            operations: self.operations,
        }
    }
}
