//! Per-sender replay protection.
//!
//! Strict mode (TTL zero) keeps one marker and requires every new nonce to
//! exceed it. Window mode keeps every marker within the TTL of the newest
//! one, so moderately out-of-order submissions are accepted while replays
//! inside the window are not.
//!
//! The window is anchored at the newest accepted marker, not at wall-clock
//! time: a sender's window only moves when that sender submits again.

use crate::{ContractConfig, NonceError};
use swapledger_engine::{StateCache, StateCacheExt};
use swapledger_types::{Address, KeyTag, NonceRecord, StateKey};

/// Digit count of a millisecond timestamp; every nonce must have exactly this.
pub const NONCE_DIGITS: u32 = 13;

const MIN_NONCE: u64 = 10u64.pow(NONCE_DIGITS - 1);
const MAX_NONCE: u64 = 10u64.pow(NONCE_DIGITS) - 1;

/// Apply the acceptance rule to a sorted marker list.
///
/// Returns the new marker list, or the reason `nonce` is rejected. The input
/// is never modified.
pub fn admit(markers: &[u64], nonce: u64, ttl_ms: u64) -> Result<Vec<u64>, NonceError> {
    if !(MIN_NONCE..=MAX_NONCE).contains(&nonce) {
        return Err(NonceError::InvalidFormat { nonce });
    }

    let Some(&newest) = markers.last() else {
        return Ok(vec![nonce]);
    };

    if ttl_ms == 0 {
        if nonce <= newest {
            return Err(NonceError::NotIncreasing { current: newest });
        }
        return Ok(vec![nonce]);
    }

    if nonce > newest {
        // Keep every marker within the TTL of the new anchor.
        let start = markers.partition_point(|&m| nonce - m > ttl_ms);
        let mut kept = Vec::with_capacity(markers.len() - start + 1);
        kept.extend_from_slice(&markers[start..]);
        kept.push(nonce);
        return Ok(kept);
    }

    if newest - nonce > ttl_ms {
        return Err(NonceError::OutOfWindow { nonce, newest });
    }

    match markers.binary_search(&nonce) {
        Ok(_) => Err(NonceError::AlreadyExists { nonce }),
        Err(index) => {
            let mut updated = Vec::with_capacity(markers.len() + 1);
            updated.extend_from_slice(&markers[..index]);
            updated.push(nonce);
            updated.extend_from_slice(&markers[index..]);
            Ok(updated)
        }
    }
}

/// Validates and records nonces in the world state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceLedger {
    ttl_ms: u64,
    tag: KeyTag,
}

impl NonceLedger {
    /// Create a ledger. `alternate_prefix` stores records under
    /// [`KeyTag::PassedNonce`], whose legacy records may be sorted descending.
    pub fn new(ttl_ms: u64, alternate_prefix: bool) -> Self {
        let tag = if alternate_prefix {
            KeyTag::PassedNonce
        } else {
            KeyTag::Nonce
        };
        Self { ttl_ms, tag }
    }

    pub fn from_config(config: &ContractConfig) -> Self {
        Self::new(config.nonce_ttl_ms, config.alternate_nonce_prefix)
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    pub fn key(&self, sender: &Address) -> StateKey {
        StateKey::new(self.tag, [sender.to_hex()])
    }

    /// Load the sender's record, normalizing legacy ordering.
    pub fn record(
        &self,
        state: &dyn StateCache,
        sender: &Address,
    ) -> Result<NonceRecord, NonceError> {
        let mut record = state
            .get_json::<NonceRecord>(&self.key(sender))?
            .unwrap_or_else(|| NonceRecord::new(*sender));

        if self.tag == KeyTag::PassedNonce && !record.is_strictly_sorted() {
            tracing::debug!(sender = %sender, "Re-sorting legacy nonce record");
            record.markers.sort_unstable();
            record.markers.dedup();
        }
        Ok(record)
    }

    /// Newest accepted nonce of `sender`, or zero.
    pub fn newest(&self, state: &dyn StateCache, sender: &Address) -> Result<u64, NonceError> {
        Ok(self.record(state, sender)?.newest().unwrap_or(0))
    }

    /// Accept `nonce` for `sender`, or reject it without touching the state.
    pub fn accept(
        &self,
        state: &mut dyn StateCache,
        sender: &Address,
        nonce: u64,
    ) -> Result<(), NonceError> {
        let mut record = self.record(state, sender)?;
        record.markers = admit(&record.markers, nonce, self.ttl_ms).map_err(|err| {
            tracing::debug!(sender = %sender, nonce, error = %err, "Nonce rejected");
            err
        })?;
        state.put_json(&self.key(sender), &record)?;
        Ok(())
    }
}
