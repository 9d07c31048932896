//! Non-negative token amounts.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Errors produced by amount arithmetic and parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount overflow")]
    Overflow,

    #[error("insufficient funds to process")]
    Insufficient,

    #[error("invalid amount {0:?}")]
    Invalid(String),
}

/// A non-negative token amount.
///
/// Serialized as a decimal string so JSON consumers never lose precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Self = Amount(0);

    pub fn new(value: u128) -> Self {
        Amount(value)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Result<Amount, AmountError> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(AmountError::Overflow)
    }

    pub fn checked_sub(self, other: Amount) -> Result<Amount, AmountError> {
        self.0
            .checked_sub(other.0)
            .map(Amount)
            .ok_or(AmountError::Insufficient)
    }

    /// Encode for storage in the world state.
    pub fn to_state_bytes(self) -> Vec<u8> {
        self.0.to_string().into_bytes()
    }

    /// Decode a stored balance; an absent value is zero.
    pub fn from_state_bytes(bytes: Option<&[u8]>) -> Result<Amount, AmountError> {
        match bytes {
            None => Ok(Amount::ZERO),
            Some(bytes) => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|_| AmountError::Invalid(hex::encode(bytes)))?;
                text.parse()
            }
        }
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Amount(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Invalid(s.to_string()));
        }
        s.parse::<u128>()
            .map(Amount)
            .map_err(|_| AmountError::Invalid(s.to_string()))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(Amount(5).checked_add(Amount(7)), Ok(Amount(12)));
        assert_eq!(Amount(5).checked_sub(Amount(7)), Err(AmountError::Insufficient));
        assert_eq!(Amount(u128::MAX).checked_add(Amount(1)), Err(AmountError::Overflow));
    }

    #[test]
    fn test_parse_rejects_signs_and_garbage() {
        assert_eq!("100".parse::<Amount>(), Ok(Amount(100)));
        assert!("-1".parse::<Amount>().is_err());
        assert!("+1".parse::<Amount>().is_err());
        assert!("".parse::<Amount>().is_err());
        assert!("1e3".parse::<Amount>().is_err());
    }

    #[test]
    fn test_state_bytes_absent_is_zero() {
        assert_eq!(Amount::from_state_bytes(None), Ok(Amount::ZERO));
        let bytes = Amount(42).to_state_bytes();
        assert_eq!(Amount::from_state_bytes(Some(&bytes)), Ok(Amount(42)));
    }

    #[test]
    fn test_serde_as_decimal_string() {
        let json = serde_json::to_string(&Amount(u128::MAX)).unwrap();
        assert_eq!(json, format!("\"{}\"", u128::MAX));
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Amount(u128::MAX));
    }
}
