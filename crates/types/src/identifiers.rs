//! Domain-specific identifier types.

use crate::{Hash, HexError, PublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction identifier.
///
/// Staged calls are keyed by the id of the transaction that staged them, and
/// a swap takes the id of the transaction that opened it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub Hash);

impl TxId {
    /// Derive a transaction id from arbitrary bytes.
    pub fn from_seed(seed: &[u8]) -> Self {
        Self(Hash::from_bytes(seed))
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, HexError> {
        Hash::from_hex(hex).map(Self)
    }

    /// Hex form, as used in state keys.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", &self.0.to_hex()[..12])
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Swap identifier. Equal to the id of the transaction that opened the swap.
pub type SwapId = TxId;

/// Identifier of a contract instance (its native asset symbol, e.g. `"VT"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(pub String);

impl ContractId {
    /// Create a contract id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for ContractId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Account address derived from the account's public key(s).
///
/// For multisig accounts the keys are sorted before hashing, so the address
/// does not depend on the order the keys were supplied in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub Hash);

impl Address {
    /// The zero address. Stands in for the missing side of a mint or burn and
    /// marks a swap whose creator has been re-keyed by the responder.
    pub const ZERO: Self = Address(Hash::ZERO);

    /// Derive an address from one or more public keys.
    pub fn from_public_keys(keys: &[PublicKey]) -> Self {
        let mut sorted: Vec<&[u8; 32]> = keys.iter().map(|k| k.as_bytes()).collect();
        sorted.sort();
        let parts: Vec<&[u8]> = sorted.iter().map(|k| k.as_slice()).collect();
        Address(Hash::from_parts(&parts))
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, HexError> {
        Hash::from_hex(hex).map(Address)
    }

    /// Hex form, as used in state keys.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}..)", &self.0.to_hex()[..8])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    #[test]
    fn test_address_independent_of_key_order() {
        let a = KeyPair::from_seed(&[1u8; 32]).public_key();
        let b = KeyPair::from_seed(&[2u8; 32]).public_key();

        assert_eq!(
            Address::from_public_keys(&[a.clone(), b.clone()]),
            Address::from_public_keys(&[b, a])
        );
    }

    #[test]
    fn test_single_key_addresses_differ() {
        let a = KeyPair::from_seed(&[1u8; 32]).public_key();
        let b = KeyPair::from_seed(&[2u8; 32]).public_key();
        assert_ne!(Address::from_public_keys(&[a]), Address::from_public_keys(&[b]));
    }

    #[test]
    fn test_tx_id_hex_roundtrip() {
        let id = TxId::from_seed(b"tx1");
        assert_eq!(TxId::from_hex(&id.to_hex()), Ok(id));
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert_eq!(Address::default(), Address::ZERO);
    }
}
