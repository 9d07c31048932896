//! Hash-locked atomic swaps between two contracts.
//!
//! A swap moves through these states:
//!
//! ```text
//! initiator                         responder
//! ─────────                         ─────────
//! open ──(relayed in a batch)──▶ answer
//!   │                              │
//!   │                              ├─ claim (user reveals secret) ──▶ Completed
//!   │                              └─ cancel after responder timeout
//!   ├─ reveal (secret relayed back) ──▶ Completed
//!   └─ cancel after user-side timeout ──▶ Cancelled (refund)
//! ```
//!
//! Single- and multi-asset swaps share one coordinator: a record carries
//! either one amount of its token or a list of `(group, amount)` legs, and
//! every debit and credit loops over [`SwapRecord::legs`].

mod operations;

pub(crate) use operations::swap_operations;
pub use operations::MultiSwapAssets;

use crate::{ContractConfig, SwapError, TxContext};
use swapledger_engine::{StateCache, StateCacheExt};
use swapledger_types::{
    Address, Amount, ContractId, Hash, KeyTag, StateKey, SwapAssets, SwapId, SwapKind, SwapRecord,
};
use tracing::debug;

/// Event name of a single-asset user-side claim.
pub const SWAP_KEY_EVENT: &str = "key";

/// Event name of a multi-asset user-side claim.
pub const MULTI_SWAP_KEY_EVENT: &str = "multi_swap_key";

/// Which side of a swap the record's token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// The token is the initiating contract's asset.
    From,
    /// The token is the responding contract's asset.
    To,
}

fn direction(swap: &SwapRecord) -> Option<Direction> {
    let token = swap.direction_token();
    if token == swap.from {
        Some(Direction::From)
    } else if token == swap.to {
        Some(Direction::To)
    } else {
        None
    }
}

/// Runs one variant of the swap protocol for one contract.
#[derive(Debug, Clone)]
pub struct SwapCoordinator {
    kind: SwapKind,
    contract_id: ContractId,
    user_side_timeout_secs: u64,
    responder_timeout_secs: u64,
}

impl SwapCoordinator {
    pub fn new(kind: SwapKind, config: &ContractConfig) -> Self {
        Self {
            kind,
            contract_id: config.contract_id.clone(),
            user_side_timeout_secs: config.user_side_timeout_secs,
            responder_timeout_secs: config.responder_timeout_secs,
        }
    }

    pub fn kind(&self) -> SwapKind {
        self.kind
    }

    /// Reason attached to accounting records.
    pub fn reason(&self) -> &'static str {
        match self.kind {
            SwapKind::Single => "swap",
            SwapKind::Multi => "multi_swap",
        }
    }

    /// Name of the event emitted by [`SwapCoordinator::claim`].
    pub fn key_event(&self) -> &'static str {
        match self.kind {
            SwapKind::Single => SWAP_KEY_EVENT,
            SwapKind::Multi => MULTI_SWAP_KEY_EVENT,
        }
    }

    pub fn key(&self, id: &SwapId) -> StateKey {
        let tag = match self.kind {
            SwapKind::Single => KeyTag::Swap,
            SwapKind::Multi => KeyTag::MultiSwap,
        };
        StateKey::new(tag, [id.to_hex()])
    }

    /// Load a stored record.
    pub fn get(&self, state: &dyn StateCache, id: &SwapId) -> Result<SwapRecord, SwapError> {
        state
            .get_json::<SwapRecord>(&self.key(id))?
            .ok_or(SwapError::NotFound)
    }

    fn save(&self, state: &mut dyn StateCache, swap: &SwapRecord) -> Result<(), SwapError> {
        state.put_json(&self.key(&swap.id), swap)?;
        Ok(())
    }

    fn remove(&self, state: &mut dyn StateCache, id: &SwapId) {
        state.delete_state(&self.key(id));
    }

    fn check_assets(&self, assets: &SwapAssets) -> Result<(), SwapError> {
        match (self.kind, assets) {
            (SwapKind::Single, SwapAssets::Single(_)) => Ok(()),
            (SwapKind::Multi, SwapAssets::Multi(list)) if list.is_empty() => {
                Err(SwapError::EmptyAssets)
            }
            (SwapKind::Multi, SwapAssets::Multi(_)) => Ok(()),
            _ => Err(SwapError::Incorrect),
        }
    }

    /// Credit one leg to `owner`. Multi-asset legs always name a group.
    fn credit(
        &self,
        ctx: &mut TxContext<'_>,
        leg: &str,
        owner: &Address,
        amount: Amount,
    ) -> Result<(), SwapError> {
        match self.kind {
            SwapKind::Single => ctx.token_credit(leg, owner, amount, self.reason())?,
            SwapKind::Multi => ctx.industrial_balance_add(leg, owner, amount, self.reason())?,
        }
        Ok(())
    }

    fn debit(
        &self,
        ctx: &mut TxContext<'_>,
        leg: &str,
        owner: &Address,
        amount: Amount,
    ) -> Result<(), SwapError> {
        match self.kind {
            SwapKind::Single => ctx.token_debit(leg, owner, amount, self.reason())?,
            SwapKind::Multi => ctx.industrial_balance_sub(leg, owner, amount, self.reason())?,
        }
        Ok(())
    }

    fn expiry(&self, now: u64, window: u64) -> Result<u64, SwapError> {
        now.checked_add(window)
            .ok_or(SwapError::TimeoutOverflow { now, window })
    }

    /// Open a swap on the initiating contract.
    ///
    /// Debits the owner's native (or group) balance when the token is this
    /// contract's asset, or its allowed balance when the token is the
    /// counterpart's asset. The swap id is the current transaction id.
    pub fn open(
        &self,
        ctx: &mut TxContext<'_>,
        owner: &Address,
        token: &str,
        assets: SwapAssets,
        to: &str,
        hash: Hash,
    ) -> Result<SwapId, SwapError> {
        self.check_assets(&assets)?;
        let timeout = self.expiry(ctx.timestamp(), self.user_side_timeout_secs)?;

        let swap = SwapRecord {
            id: ctx.tx_id(),
            creator: *owner,
            owner: *owner,
            token: token.to_string(),
            from: self.contract_id.to_string(),
            to: to.to_string(),
            assets,
            hash,
            timeout,
        };

        let reason = self.reason();
        match direction(&swap).ok_or(SwapError::Incorrect)? {
            Direction::From => {
                for (leg, amount) in swap.legs() {
                    self.debit(ctx, leg, owner, amount)?;
                }
            }
            Direction::To => {
                for (leg, amount) in swap.legs() {
                    ctx.allowed_balance_sub(leg, owner, amount, reason)?;
                }
            }
        }

        self.save(ctx.state_mut(), &swap)?;
        debug!(swap_id = %swap.id, token, to, timeout = swap.timeout, "Swap opened");
        let id = swap.id;
        ctx.push_created_swap(swap);
        Ok(id)
    }

    /// Counter-lock a relayed swap on the responding contract.
    ///
    /// The creator becomes the sentinel and the expiry shrinks to the
    /// responder window. When the token is this contract's asset, the given
    /// balance owed to the initiator shrinks by each leg.
    pub fn answer(&self, ctx: &mut TxContext<'_>, mut swap: SwapRecord) -> Result<(), SwapError> {
        self.check_assets(&swap.assets)?;
        swap.creator = Address::ZERO;
        swap.timeout = self.expiry(ctx.timestamp(), self.responder_timeout_secs)?;

        match direction(&swap).ok_or(SwapError::Incorrect)? {
            Direction::From => {}
            Direction::To => {
                for (_, amount) in swap.legs() {
                    ctx.given_balance_sub(&swap.from, amount, self.reason())?;
                }
            }
        }

        self.save(ctx.state_mut(), &swap)?;
        debug!(swap_id = %swap.id, "Swap answered");
        Ok(())
    }

    /// Complete the initiating side once the secret is relayed back.
    pub fn reveal(&self, ctx: &mut TxContext<'_>, id: &SwapId, key: &str) -> Result<(), SwapError> {
        let swap = self.get(ctx.state(), id)?;
        if !swap.matches_secret(key) {
            return Err(SwapError::IncorrectKey);
        }

        if direction(&swap) == Some(Direction::From) {
            for (_, amount) in swap.legs() {
                ctx.given_balance_add(&swap.to, amount, self.reason())?;
            }
        }

        self.remove(ctx.state_mut(), id);
        debug!(swap_id = %id, "Swap revealed");
        Ok(())
    }

    /// User-side completion on the responding contract.
    ///
    /// Credits the owner and emits `"<from>\t<swap id>\t<secret>"` for the
    /// relay that completes the initiating side.
    pub fn claim(&self, ctx: &mut TxContext<'_>, id: &SwapId, key: &str) -> Result<(), SwapError> {
        let swap = self.get(ctx.state(), id)?;
        if !swap.matches_secret(key) {
            return Err(SwapError::IncorrectKey);
        }
        if swap.creator == swap.owner {
            return Err(SwapError::Incorrect);
        }

        let reason = self.reason();
        if direction(&swap) == Some(Direction::From) {
            for (leg, amount) in swap.legs() {
                ctx.allowed_balance_add(leg, &swap.owner, amount, reason)?;
            }
        } else {
            for (leg, amount) in swap.legs() {
                self.credit(ctx, leg, &swap.owner, amount)?;
            }
        }

        self.remove(ctx.state_mut(), id);
        let event = [swap.from.as_str(), &id.to_hex(), key].join("\t");
        ctx.set_event(self.key_event(), event.into_bytes());
        debug!(swap_id = %id, "Swap claimed");
        Ok(())
    }

    /// Refund an expired swap. Only the record's creator may cancel.
    pub fn cancel(
        &self,
        ctx: &mut TxContext<'_>,
        sender: &Address,
        id: &SwapId,
    ) -> Result<(), SwapError> {
        let swap = self.get(ctx.state(), id)?;
        if swap.creator != *sender {
            return Err(SwapError::Unauthorized);
        }
        let now = ctx.timestamp();
        if swap.timeout > now {
            return Err(SwapError::NotExpired {
                timeout: swap.timeout,
                now,
            });
        }

        let reason = self.reason();
        let initiator_side = swap.creator == swap.owner;
        match direction(&swap) {
            Some(Direction::From) if initiator_side => {
                for (leg, amount) in swap.legs() {
                    self.credit(ctx, leg, &swap.owner, amount)?;
                }
            }
            Some(Direction::To) if initiator_side => {
                for (leg, amount) in swap.legs() {
                    ctx.allowed_balance_add(leg, &swap.owner, amount, reason)?;
                }
            }
            Some(Direction::To) if swap.is_answered() => {
                for (_, amount) in swap.legs() {
                    ctx.given_balance_add(&swap.from, amount, reason)?;
                }
            }
            _ => {}
        }

        self.remove(ctx.state_mut(), id);
        debug!(swap_id = %id, "Swap cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
