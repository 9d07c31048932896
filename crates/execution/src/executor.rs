//! Batch executor.
//!
//! Runs the staged calls named by a batch, strictly in order, each against
//! its own [`TxContext`] over one shared [`BatchCache`]:
//!
//! ```text
//! Staged ─take─▶ Loaded ─ttl/nonce/resolve─▶ Executing ─┬─▶ Committed (folded into the batch cache)
//!                  │                                    └─▶ Failed (transaction cache dropped)
//!                  └──────────────────────────────────────▶ Failed
//! ```
//!
//! A failing or panicking transaction never affects its siblings. Embedded
//! swap answers and secret reveals run after the transactions. Only a
//! failure to commit the batch cache to the world state aborts the batch.

use crate::staging;
use crate::swap::SwapCoordinator;
use crate::{
    ContractConfig, ExecutionError, HandlerError, NonceLedger, Operation, OperationRegistry,
    SwapError, TxContext, TxEffects, TxError,
};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use swapledger_engine::{BatchCache, WorldState};
use swapledger_types::{
    Batch, BatchEvent, BatchResponse, BatchTxEvent, ContractEvent, Hash, PendingTransaction,
    SwapId, SwapKind, SwapResponse, TxId, TxResponse, BATCH_EVENT_NAME,
};
use tracing::{debug, error, info, warn};

/// Ledger-supplied context of one batch submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchInvocation {
    /// Id of the ledger transaction carrying the batch.
    pub batch_id: TxId,
    /// Batch timestamp, in seconds.
    pub timestamp: u64,
    /// Fingerprint of the submitting identity.
    pub caller: Hash,
}

/// Result of one executed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub response: BatchResponse,
    pub batch_event: BatchEvent,
    /// `batch_event` encoded under [`BATCH_EVENT_NAME`].
    pub event: ContractEvent,
}

/// Result of one transaction inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub id: TxId,
    /// Empty when the staged call could not be loaded.
    pub method: String,
    pub result: Result<TxEffects, TxError>,
}

impl TxOutcome {
    fn failed(id: TxId, method: impl Into<String>, err: TxError) -> Self {
        Self {
            id,
            method: method.into(),
            result: Err(err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    fn error_message(&self) -> Option<String> {
        self.result.as_ref().err().map(TxError::response_message)
    }

    pub fn response(&self) -> TxResponse {
        TxResponse {
            id: self.id,
            method: self.method.clone(),
            error: self.error_message(),
            writes: self
                .result
                .as_ref()
                .map(|effects| effects.writes.clone())
                .unwrap_or_default(),
        }
    }

    pub fn event(&self) -> BatchTxEvent {
        let (result, accounting, events) = match &self.result {
            Ok(effects) => (
                effects.result.clone(),
                effects.accounting.clone(),
                effects.events.clone(),
            ),
            Err(_) => Default::default(),
        };
        BatchTxEvent {
            id: self.id,
            method: self.method.clone(),
            error: self.error_message(),
            result,
            accounting,
            events,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn handler_error(err: HandlerError) -> TxError {
    match err {
        HandlerError::Swap(err) => err.into(),
        other => TxError::Handler(other),
    }
}

/// Executes batches for one contract.
pub struct BatchExecutor<'a> {
    config: &'a ContractConfig,
    registry: &'a OperationRegistry,
    nonces: NonceLedger,
    swaps: SwapCoordinator,
    multi_swaps: SwapCoordinator,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(config: &'a ContractConfig, registry: &'a OperationRegistry) -> Self {
        Self {
            config,
            registry,
            nonces: NonceLedger::from_config(config),
            swaps: SwapCoordinator::new(SwapKind::Single, config),
            multi_swaps: SwapCoordinator::new(SwapKind::Multi, config),
        }
    }

    /// Execute `batch` and commit its writes to `world`.
    pub fn execute(
        &self,
        world: &mut dyn WorldState,
        invocation: &BatchInvocation,
        batch: &Batch,
    ) -> Result<BatchOutcome, ExecutionError> {
        // Embedded swap answers carry no client signature; the submitter's
        // attested identity is their only authorization.
        match self.config.batch_submitter {
            Some(submitter) if submitter == invocation.caller => {}
            Some(_) => {
                warn!(caller = %invocation.caller, "Batch from unauthorized submitter");
                return Err(ExecutionError::UnauthorizedSubmitter(invocation.caller));
            }
            None => {
                warn!(caller = %invocation.caller, "Batch rejected, no submitter configured");
                return Err(ExecutionError::NoSubmitter);
            }
        }

        let started = Instant::now();
        let mut cache = BatchCache::new(world);
        let mut response = BatchResponse::default();
        let mut batch_event = BatchEvent::default();

        for tx_id in &batch.tx_ids {
            let outcome = self.run_transaction(&mut cache, tx_id, invocation);
            response.tx_responses.push(outcome.response());
            batch_event.events.push(outcome.event());
            if let Ok(effects) = outcome.result {
                response.created_swaps.extend(effects.created_swaps);
                response.created_multi_swaps.extend(effects.created_multi_swaps);
            }
        }
        batch_event.created_swaps = response.created_swaps.clone();
        batch_event.created_multi_swaps = response.created_multi_swaps.clone();

        if !self.config.disable_swaps {
            for swap in &batch.swaps {
                response.swap_responses.push(self.run_swap_step(
                    &mut cache,
                    invocation,
                    swap.id,
                    |ctx| self.swaps.answer(ctx, swap.clone()),
                ));
            }
            for reveal in &batch.keys {
                response.swap_key_responses.push(self.run_swap_step(
                    &mut cache,
                    invocation,
                    reveal.id,
                    |ctx| self.swaps.reveal(ctx, &reveal.id, &reveal.key),
                ));
            }
        }

        if !self.config.disable_multi_swaps {
            for swap in &batch.multi_swaps {
                response.swap_responses.push(self.run_swap_step(
                    &mut cache,
                    invocation,
                    swap.id,
                    |ctx| self.multi_swaps.answer(ctx, swap.clone()),
                ));
            }
            for reveal in &batch.multi_swap_keys {
                response.swap_key_responses.push(self.run_swap_step(
                    &mut cache,
                    invocation,
                    reveal.id,
                    |ctx| self.multi_swaps.reveal(ctx, &reveal.id, &reveal.key),
                ));
            }
        }

        let written = cache.commit().map_err(|err| {
            error!(batch_id = %invocation.batch_id, error = %err, "Batch commit failed");
            ExecutionError::Commit(err)
        })?;

        let payload = serde_json::to_vec(&batch_event)
            .map_err(|err| ExecutionError::Encode(err.to_string()))?;

        let failed = response
            .tx_responses
            .iter()
            .filter(|tx| tx.error.is_some())
            .count();
        info!(
            batch_id = %invocation.batch_id,
            txs = response.tx_responses.len(),
            failed,
            swaps = response.swap_responses.len(),
            keys = response.swap_key_responses.len(),
            written,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch executed"
        );

        Ok(BatchOutcome {
            response,
            batch_event,
            event: ContractEvent::new(BATCH_EVENT_NAME, payload),
        })
    }

    /// Load, check and run one staged call.
    pub fn run_transaction(
        &self,
        cache: &mut BatchCache<'_>,
        tx_id: &TxId,
        invocation: &BatchInvocation,
    ) -> TxOutcome {
        let pending = match staging::take(cache, &self.config.batch_prefix, tx_id) {
            Ok(pending) => pending,
            Err(err) => {
                warn!(tx_id = %tx_id, error = %err, "Staged call not loaded");
                return TxOutcome::failed(*tx_id, "", err);
            }
        };

        let method = pending.method.clone();
        let outcome = match self.prepare(cache, tx_id, &pending, invocation.timestamp) {
            Ok(operation) => self.call(cache, tx_id, operation, &pending, invocation),
            Err(err) => Err(err),
        };

        match &outcome {
            Ok(effects) => debug!(
                tx_id = %tx_id,
                method = %method,
                writes = effects.writes.len(),
                "Transaction committed"
            ),
            Err(TxError::Panic { .. }) => {}
            Err(err) => warn!(tx_id = %tx_id, method = %method, error = %err, "Transaction failed"),
        }

        TxOutcome {
            id: *tx_id,
            method,
            result: outcome,
        }
    }

    /// Expiry, sender and nonce checks, then routing.
    fn prepare(
        &self,
        cache: &mut BatchCache<'_>,
        tx_id: &TxId,
        pending: &PendingTransaction,
        batch_ts: u64,
    ) -> Result<&'a Operation, TxError> {
        let ttl = self.config.tx_ttl_secs;
        if ttl > 0 && pending.timestamp.saturating_add(ttl) < batch_ts {
            return Err(TxError::Expired {
                staged_at: pending.timestamp,
                batch_ts,
            });
        }

        // Routing precedes the nonce check: only operations that need a
        // signed sender consume a nonce, and that is known once resolved.
        let operation = self
            .registry
            .resolve(&pending.method)
            .ok_or_else(|| TxError::UnknownOperation(pending.method.clone()))?;

        if operation.needs_auth() {
            let sender = pending.sender.as_ref().ok_or(TxError::NoSender(*tx_id))?;
            if self.config.is_window_mode() {
                self.nonces
                    .accept(cache, sender, pending.nonce)
                    .map_err(TxError::ReplayRejected)?;
            }
        }
        Ok(operation)
    }

    fn call(
        &self,
        cache: &mut BatchCache<'_>,
        tx_id: &TxId,
        operation: &Operation,
        pending: &PendingTransaction,
        invocation: &BatchInvocation,
    ) -> Result<TxEffects, TxError> {
        let args = operation
            .parse_args(&pending.args)
            .map_err(|err| TxError::Handler(err.into()))?;

        let mut ctx = TxContext::new(
            cache,
            *tx_id,
            invocation.timestamp,
            pending.caller_fingerprint,
            self.config.contract_id.clone(),
        );

        let result = catch_unwind(AssertUnwindSafe(|| {
            operation.call(&mut ctx, pending.sender.as_ref(), &args)
        }));

        match result {
            Ok(Ok(result)) => Ok(ctx.finish(result)),
            Ok(Err(err)) => Err(handler_error(err)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(tx_id = %tx_id, method = operation.name(), panic = %message, "Handler panicked");
                Err(TxError::Panic {
                    method: operation.name().to_string(),
                    message,
                })
            }
        }
    }

    /// Run one embedded swap step in its own transaction cache.
    fn run_swap_step<F>(
        &self,
        cache: &mut BatchCache<'_>,
        invocation: &BatchInvocation,
        id: SwapId,
        step: F,
    ) -> SwapResponse
    where
        F: FnOnce(&mut TxContext<'_>) -> Result<(), SwapError>,
    {
        let mut ctx = TxContext::new(
            cache,
            invocation.batch_id,
            invocation.timestamp,
            invocation.caller,
            self.config.contract_id.clone(),
        );

        let error = match catch_unwind(AssertUnwindSafe(|| step(&mut ctx))) {
            Ok(Ok(())) => {
                let effects = ctx.finish(None);
                return SwapResponse {
                    id,
                    error: None,
                    writes: effects.writes,
                };
            }
            Ok(Err(err)) => TxError::from(err).to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        warn!(swap_id = %id, error = %error, "Swap step failed");
        SwapResponse {
            id,
            error: Some(error),
            writes: Vec::new(),
        }
    }
}
