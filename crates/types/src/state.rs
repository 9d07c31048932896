//! Buffered writes and per-sender nonce records.

use crate::Address;
use serde::{Deserialize, Serialize};

/// One buffered mutation of the world state.
///
/// A key appears at most once per cache snapshot; the last write wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteElement {
    /// Encoded state key.
    #[serde(with = "hex::serde")]
    pub key: Vec<u8>,

    /// New value (empty when deleted).
    #[serde(with = "hex::serde")]
    pub value: Vec<u8>,

    /// Whether the key is tombstoned.
    pub is_deleted: bool,
}

impl WriteElement {
    /// A live value.
    pub fn put(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            key,
            value,
            is_deleted: false,
        }
    }

    /// A tombstone.
    pub fn delete(key: Vec<u8>) -> Self {
        Self {
            key,
            value: Vec::new(),
            is_deleted: true,
        }
    }

    /// The value, or `None` for a tombstone.
    pub fn live_value(&self) -> Option<&[u8]> {
        if self.is_deleted {
            None
        } else {
            Some(&self.value)
        }
    }
}

/// Recently accepted nonce markers of one sender.
///
/// Markers are strictly ascending and unique. Strict mode keeps a single
/// marker; window mode keeps every marker within the TTL of the newest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceRecord {
    pub sender: Address,
    pub markers: Vec<u64>,
}

impl NonceRecord {
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            markers: Vec::new(),
        }
    }

    /// Newest accepted marker.
    pub fn newest(&self) -> Option<u64> {
        self.markers.last().copied()
    }

    /// Whether the markers satisfy the ordering invariant.
    pub fn is_strictly_sorted(&self) -> bool {
        self.markers.windows(2).all(|pair| pair[0] < pair[1])
    }
}
