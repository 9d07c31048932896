//! Contract entry point.
//!
//! [`Contract::invoke`] dispatches one ledger call:
//!
//! - `batchExecute` runs a submitted [`Batch`];
//! - `swapDone` / `multiSwapDone` complete a swap on the user side;
//! - query and no-batch operations run immediately;
//! - every other operation is authorized and staged for a later batch.

use crate::auth::{authorize, AccessControl, SignedRequest};
use crate::swap::SwapCoordinator;
use crate::{
    staging, ArgError, AuthError, BatchExecutor, BatchInvocation, ConfigError, ContractConfig,
    ContractError, ExecutionError, NonceLedger, Operation, OperationKind, OperationRegistry,
    TxContext,
};
use std::collections::BTreeMap;
use swapledger_engine::{BatchCache, TxCache, WorldState};
use swapledger_types::{
    Address, Batch, ContractEvent, Hash, PendingTransaction, SwapKind, TxId, WriteElement,
};
use tracing::debug;

/// Function that executes a batch.
pub const BATCH_EXECUTE: &str = "batchExecute";

/// Function that completes a single-asset swap on the user side.
pub const SWAP_DONE: &str = "swapDone";

/// Function that completes a multi-asset swap on the user side.
pub const MULTI_SWAP_DONE: &str = "multiSwapDone";

/// Ledger-supplied context of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub tx_id: TxId,
    /// Seconds.
    pub timestamp: u64,
    /// Fingerprint of the calling identity.
    pub caller: Hash,
    pub channel: String,
}

impl Invocation {
    fn batch(&self) -> BatchInvocation {
        BatchInvocation {
            batch_id: self.tx_id,
            timestamp: self.timestamp,
            caller: self.caller,
        }
    }
}

/// What one call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeResponse {
    pub payload: Option<Vec<u8>>,
    pub events: Vec<ContractEvent>,
    /// Writes committed by a direct call, sorted by key.
    pub writes: Vec<WriteElement>,
}

fn contract_events(events: BTreeMap<String, Vec<u8>>) -> Vec<ContractEvent> {
    events
        .into_iter()
        .map(|(name, payload)| ContractEvent::new(name, payload))
        .collect()
}

/// One contract instance: configuration, operations and access control.
pub struct Contract {
    config: ContractConfig,
    registry: OperationRegistry,
    acl: Box<dyn AccessControl>,
    nonces: NonceLedger,
}

impl Contract {
    pub fn new(
        config: ContractConfig,
        registry: OperationRegistry,
        acl: impl AccessControl + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            nonces: NonceLedger::from_config(&config),
            config,
            registry,
            acl: Box::new(acl),
        })
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn executor(&self) -> BatchExecutor<'_> {
        BatchExecutor::new(&self.config, &self.registry)
    }

    /// Handle one ledger call against `world`.
    pub fn invoke(
        &self,
        world: &mut dyn WorldState,
        invocation: &Invocation,
        function: &str,
        args: &[String],
    ) -> Result<InvokeResponse, ContractError> {
        match function {
            BATCH_EXECUTE => self.execute_batch(world, invocation, args),
            SWAP_DONE => {
                if self.config.disable_swaps {
                    return Err(ContractError::Disabled("swaps disabled"));
                }
                self.swap_done(world, invocation, SwapKind::Single, args)
            }
            MULTI_SWAP_DONE => {
                if self.config.disable_multi_swaps {
                    return Err(ContractError::Disabled("industrial swaps disabled"));
                }
                self.swap_done(world, invocation, SwapKind::Multi, args)
            }
            _ => {
                let operation = self
                    .registry
                    .resolve(function)
                    .ok_or_else(|| ContractError::UnknownFunction(function.to_string()))?;
                match operation.kind() {
                    OperationKind::Query => self.call_now(world, invocation, operation, args, false),
                    OperationKind::NoBatch => self.call_now(world, invocation, operation, args, true),
                    OperationKind::Tx => self.stage(world, invocation, operation, args),
                }
            }
        }
    }

    fn execute_batch(
        &self,
        world: &mut dyn WorldState,
        invocation: &Invocation,
        args: &[String],
    ) -> Result<InvokeResponse, ContractError> {
        let [raw] = args else {
            return Err(ExecutionError::InvalidBatch(format!(
                "expected 1 argument, got {}",
                args.len()
            ))
            .into());
        };
        let batch =
            Batch::from_json(raw).map_err(|err| ExecutionError::InvalidBatch(err.to_string()))?;

        let outcome = self.executor().execute(world, &invocation.batch(), &batch)?;
        let payload = serde_json::to_vec(&outcome.response)
            .map_err(|err| ExecutionError::Encode(err.to_string()))?;

        Ok(InvokeResponse {
            payload: Some(payload),
            events: vec![outcome.event],
            writes: Vec::new(),
        })
    }

    fn swap_done(
        &self,
        world: &mut dyn WorldState,
        invocation: &Invocation,
        kind: SwapKind,
        args: &[String],
    ) -> Result<InvokeResponse, ContractError> {
        let [id, key] = args else {
            return Err(ArgError::Count {
                expected: 2,
                actual: args.len(),
            }
            .into());
        };
        let id = TxId::from_hex(id).map_err(|_| ArgError::Invalid {
            index: 0,
            kind: "hex",
            value: id.clone(),
        })?;

        let coordinator = SwapCoordinator::new(kind, &self.config);
        let mut cache = BatchCache::new(world);
        let mut ctx = self.context(&mut cache, invocation);
        coordinator.claim(&mut ctx, &id, key)?;
        let effects = ctx.finish(None);
        cache.commit()?;

        debug!(swap_id = %id, kind = ?kind, "Swap completed on user side");
        Ok(InvokeResponse {
            payload: None,
            events: contract_events(effects.events),
            writes: effects.writes,
        })
    }

    /// Run a query or no-batch operation immediately.
    fn call_now(
        &self,
        world: &mut dyn WorldState,
        invocation: &Invocation,
        operation: &Operation,
        args: &[String],
        commit: bool,
    ) -> Result<InvokeResponse, ContractError> {
        let mut cache = BatchCache::new(world);
        let (sender, _, args) = self.authorize(&mut cache, invocation, operation, args)?;
        let args = operation.parse_args(&args)?;

        let mut ctx = self.context(&mut cache, invocation);
        let payload = operation.call(&mut ctx, sender.as_ref(), &args)?;
        if !commit {
            // Query writes go with the context; an accepted nonce stays.
            drop(ctx);
            cache.commit()?;
            return Ok(InvokeResponse {
                payload,
                ..Default::default()
            });
        }
        let effects = ctx.finish(payload);
        cache.commit()?;

        Ok(InvokeResponse {
            payload: effects.result,
            events: contract_events(effects.events),
            writes: effects.writes,
        })
    }

    /// Authorize and store a call for a later batch.
    fn stage(
        &self,
        world: &mut dyn WorldState,
        invocation: &Invocation,
        operation: &Operation,
        args: &[String],
    ) -> Result<InvokeResponse, ContractError> {
        let mut cache = BatchCache::new(world);
        let (sender, nonce, args) = self.authorize(&mut cache, invocation, operation, args)?;

        let pending = PendingTransaction {
            method: operation.name().to_string(),
            sender,
            args,
            caller_fingerprint: invocation.caller,
            timestamp: invocation.timestamp,
            nonce,
        };

        let mut staged = TxCache::new(&mut cache);
        staging::stage(&mut staged, &self.config.batch_prefix, &invocation.tx_id, &pending)?;
        let writes = staged.commit();
        cache.commit()?;

        debug!(tx_id = %invocation.tx_id, method = operation.name(), "Call staged");
        Ok(InvokeResponse {
            payload: None,
            events: Vec::new(),
            writes,
        })
    }

    /// Resolve the sender and nonce of an operation that needs them.
    ///
    /// In strict nonce mode the nonce is accepted into `cache` and lands in
    /// the same commit as the call's own writes; in window mode the batch
    /// executor checks it when the call is loaded.
    fn authorize(
        &self,
        cache: &mut BatchCache<'_>,
        invocation: &Invocation,
        operation: &Operation,
        args: &[String],
    ) -> Result<(Option<Address>, u64, Vec<String>), ContractError> {
        if !operation.needs_auth() {
            return Ok((None, 0, args.to_vec()));
        }

        let request = SignedRequest::from_wire(operation.name(), args, operation.arity())?;
        let authorized = authorize(
            self.acl.as_ref(),
            request,
            self.config.contract_id.as_str(),
            &invocation.channel,
        )?;

        if !self.config.is_window_mode() {
            self.nonces
                .accept(cache, &authorized.sender, authorized.nonce)
                .map_err(AuthError::Nonce)?;
        }
        Ok((Some(authorized.sender), authorized.nonce, authorized.args))
    }

    fn context<'c>(&self, cache: &'c mut BatchCache<'_>, invocation: &Invocation) -> TxContext<'c> {
        TxContext::new(
            cache,
            invocation.tx_id,
            invocation.timestamp,
            invocation.caller,
            self.config.contract_id.clone(),
        )
    }
}
