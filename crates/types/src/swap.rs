//! Hash-locked swap records.

use crate::{Address, Amount, Hash, SwapId};
use serde::{Deserialize, Serialize};

/// One asset group and amount of a multi-asset swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    pub group: String,
    pub amount: Amount,
}

impl AssetAmount {
    pub fn new(group: impl Into<String>, amount: Amount) -> Self {
        Self {
            group: group.into(),
            amount,
        }
    }
}

/// What a swap moves: one amount of the swap's token, or a list of groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapAssets {
    Single(Amount),
    Multi(Vec<AssetAmount>),
}

/// Which variant of the protocol a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapKind {
    Single,
    Multi,
}

/// A swap as stored by whichever contract currently holds the locked funds.
///
/// `creator` is the opener on the initiating side and [`Address::ZERO`] once a
/// responder has answered; `owner` never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRecord {
    pub id: SwapId,
    pub creator: Address,
    pub owner: Address,
    pub token: String,
    pub from: String,
    pub to: String,
    pub assets: SwapAssets,
    pub hash: Hash,
    /// Expiry, in seconds.
    pub timeout: u64,
}

impl SwapRecord {
    pub fn kind(&self) -> SwapKind {
        match self.assets {
            SwapAssets::Single(_) => SwapKind::Single,
            SwapAssets::Multi(_) => SwapKind::Multi,
        }
    }

    /// Token identifier compared with `from`/`to` to find the direction.
    ///
    /// Single-asset swaps use the symbol (text before the first `_`),
    /// multi-asset swaps the token itself.
    pub fn direction_token(&self) -> &str {
        match self.assets {
            SwapAssets::Single(_) => token_symbol(&self.token),
            SwapAssets::Multi(_) => &self.token,
        }
    }

    /// `(token id, amount)` pairs every debit and credit loops over.
    pub fn legs(&self) -> Vec<(&str, Amount)> {
        match &self.assets {
            SwapAssets::Single(amount) => vec![(self.token.as_str(), *amount)],
            SwapAssets::Multi(assets) => assets
                .iter()
                .map(|asset| (asset.group.as_str(), asset.amount))
                .collect(),
        }
    }

    /// Whether the record was answered by a responder.
    pub fn is_answered(&self) -> bool {
        self.creator.is_zero()
    }

    /// Whether `secret` is the preimage of the stored hash.
    pub fn matches_secret(&self, secret: &str) -> bool {
        Hash::from_bytes(secret.as_bytes()) == self.hash
    }
}

/// Symbol part of a token id (`"CC_GROUP"` → `"CC"`).
pub fn token_symbol(token: &str) -> &str {
    token.split('_').next().unwrap_or(token)
}

/// Group part of a token id (`"CC_GROUP"` → `Some("GROUP")`, `"CC"` → `None`).
pub fn token_group(token: &str) -> Option<&str> {
    token.rsplit_once('_').map(|(_, group)| group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TxId;

    fn record(token: &str, assets: SwapAssets) -> SwapRecord {
        SwapRecord {
            id: TxId::from_seed(b"swap"),
            creator: Address::ZERO,
            owner: Address::ZERO,
            token: token.to_string(),
            from: "CC".to_string(),
            to: "VT".to_string(),
            assets,
            hash: Hash::from_bytes(b"abc"),
            timeout: 0,
        }
    }

    #[test]
    fn test_token_symbol_and_group() {
        assert_eq!(token_symbol("CC_GROUP"), "CC");
        assert_eq!(token_symbol("CC"), "CC");
        assert_eq!(token_group("CC_A_B"), Some("B"));
        assert_eq!(token_group("CC"), None);
    }

    #[test]
    fn test_direction_token_per_variant() {
        let single = record("CC_GROUP", SwapAssets::Single(Amount(1)));
        assert_eq!(single.direction_token(), "CC");

        let multi = record("CC_GROUP", SwapAssets::Multi(vec![]));
        assert_eq!(multi.direction_token(), "CC_GROUP");
    }

    #[test]
    fn test_legs() {
        let single = record("CC", SwapAssets::Single(Amount(5)));
        assert_eq!(single.legs(), vec![("CC", Amount(5))]);

        let multi = record(
            "CC",
            SwapAssets::Multi(vec![
                AssetAmount::new("CC_A", Amount(1)),
                AssetAmount::new("CC_B", Amount(2)),
            ]),
        );
        assert_eq!(multi.legs(), vec![("CC_A", Amount(1)), ("CC_B", Amount(2))]);
    }

    #[test]
    fn test_matches_secret() {
        let r = record("CC", SwapAssets::Single(Amount(1)));
        assert!(r.matches_secret("abc"));
        assert!(!r.matches_secret("xyz"));
    }
}
