//! Structured world-state keys.
//!
//! A key is a one-byte type tag followed by an ordered list of string
//! components. Each component is written as its bytes with every `0x00`
//! escaped to `0x00 0xFF`, then terminated by `0x00 0x01`. The encoding is
//! order-preserving (byte order of encoded keys matches component-wise
//! lexicographic order) and prefix-closed: the encoding of `(tag, c1..ck)` is
//! a byte prefix of every key that extends it, so a prefix scan over it yields
//! exactly that subtree.

use serde::{Deserialize, Serialize};
use std::fmt;

const ESCAPE: u8 = 0x00;
const ESCAPED_NUL: u8 = 0xFF;
const TERMINATOR: u8 = 0x01;

/// Type tag of a state key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyTag {
    /// Handler-defined contract data.
    Contract = 0x01,
    /// Staged calls awaiting batch execution.
    PendingTx = 0x02,
    /// Nonce records (primary prefix).
    Nonce = 42,
    /// Native and group token balances.
    TokenBalance = 43,
    /// Cross-contract ("allowed") balances.
    AllowedBalance = 44,
    /// Obligations owed to counterpart contracts.
    GivenBalance = 45,
    /// Locked token balances.
    LockedTokenBalance = 46,
    /// Locked allowed balances.
    LockedAllowedBalance = 47,
    /// Nonce records (alternate prefix).
    PassedNonce = 48,
    /// Single-asset swap records.
    Swap = 0x40,
    /// Multi-asset swap records.
    MultiSwap = 0x41,
}

impl KeyTag {
    /// Raw tag byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse a tag byte.
    pub fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0x01 => KeyTag::Contract,
            0x02 => KeyTag::PendingTx,
            42 => KeyTag::Nonce,
            43 => KeyTag::TokenBalance,
            44 => KeyTag::AllowedBalance,
            45 => KeyTag::GivenBalance,
            46 => KeyTag::LockedTokenBalance,
            47 => KeyTag::LockedAllowedBalance,
            48 => KeyTag::PassedNonce,
            0x40 => KeyTag::Swap,
            0x41 => KeyTag::MultiSwap,
            _ => return None,
        })
    }
}

/// Errors decoding an encoded state key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyDecodeError {
    #[error("empty key")]
    Empty,

    #[error("unknown key tag {0:#04x}")]
    UnknownTag(u8),

    #[error("key component is not terminated")]
    Truncated,

    #[error("invalid escape byte {0:#04x}")]
    InvalidEscape(u8),

    #[error("key component is not valid UTF-8")]
    InvalidUtf8,
}

/// A structured world-state key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey {
    pub tag: KeyTag,
    pub components: Vec<String>,
}

impl StateKey {
    /// Create a key from a tag and components.
    ///
    /// # Example
    ///
    /// ```
    /// use swapledger_types::{KeyTag, StateKey};
    ///
    /// let key = StateKey::new(KeyTag::Swap, ["abc"]);
    /// assert_eq!(StateKey::decode(&key.encode()).unwrap(), key);
    /// ```
    pub fn new<I, S>(tag: KeyTag, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tag,
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    /// Encode into the order-preserving byte form.
    pub fn encode(&self) -> Vec<u8> {
        encode_parts(self.tag, &self.components)
    }

    /// Decode a key produced by [`StateKey::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, KeyDecodeError> {
        let (&tag_byte, mut rest) = bytes.split_first().ok_or(KeyDecodeError::Empty)?;
        let tag = KeyTag::from_u8(tag_byte).ok_or(KeyDecodeError::UnknownTag(tag_byte))?;

        let mut components = Vec::new();
        while !rest.is_empty() {
            let mut component = Vec::new();
            loop {
                match rest {
                    [] | [ESCAPE] => return Err(KeyDecodeError::Truncated),
                    [ESCAPE, TERMINATOR, tail @ ..] => {
                        rest = tail;
                        break;
                    }
                    [ESCAPE, ESCAPED_NUL, tail @ ..] => {
                        component.push(0x00);
                        rest = tail;
                    }
                    [ESCAPE, other, ..] => return Err(KeyDecodeError::InvalidEscape(*other)),
                    [byte, tail @ ..] => {
                        component.push(*byte);
                        rest = tail;
                    }
                }
            }
            let component =
                String::from_utf8(component).map_err(|_| KeyDecodeError::InvalidUtf8)?;
            components.push(component);
        }

        Ok(Self { tag, components })
    }

    /// Encoded prefix matching every key under `tag` whose leading components
    /// equal `components`.
    pub fn prefix<S: AsRef<str>>(tag: KeyTag, components: &[S]) -> Vec<u8> {
        encode_parts(tag, components)
    }

    /// Last component, if any.
    pub fn last(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.tag)?;
        for component in &self.components {
            write!(f, "::{}", component)?;
        }
        Ok(())
    }
}

fn encode_parts<S: AsRef<str>>(tag: KeyTag, components: &[S]) -> Vec<u8> {
    let len: usize = components.iter().map(|c| c.as_ref().len() + 2).sum();
    let mut out = Vec::with_capacity(1 + len);
    out.push(tag.as_u8());
    for component in components {
        for &byte in component.as_ref().as_bytes() {
            if byte == ESCAPE {
                out.push(ESCAPE);
                out.push(ESCAPED_NUL);
            } else {
                out.push(byte);
            }
        }
        out.push(ESCAPE);
        out.push(TERMINATOR);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_with_embedded_nul() {
        let key = StateKey::new(KeyTag::Contract, ["a\0b", "", "c"]);
        assert_eq!(StateKey::decode(&key.encode()).unwrap(), key);
    }

    #[test]
    fn test_encoding_preserves_component_order() {
        let ordered = [
            StateKey::new(KeyTag::TokenBalance, ["a"]),
            StateKey::new(KeyTag::TokenBalance, ["a", "x"]),
            StateKey::new(KeyTag::TokenBalance, ["a\0"]),
            StateKey::new(KeyTag::TokenBalance, ["ab"]),
            StateKey::new(KeyTag::TokenBalance, ["b"]),
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].encode() < pair[1].encode(), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_prefix_matches_exactly_the_subtree() {
        let prefix = StateKey::prefix(KeyTag::TokenBalance, &["alice"]);
        let inside = StateKey::new(KeyTag::TokenBalance, ["alice", "GROUP"]).encode();
        let native = StateKey::new(KeyTag::TokenBalance, ["alice"]).encode();
        let sibling = StateKey::new(KeyTag::TokenBalance, ["alicex", "GROUP"]).encode();
        let other_tag = StateKey::new(KeyTag::AllowedBalance, ["alice"]).encode();

        assert!(inside.starts_with(&prefix));
        assert!(native.starts_with(&prefix));
        assert!(!sibling.starts_with(&prefix));
        assert!(!other_tag.starts_with(&prefix));
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(StateKey::decode(&[]), Err(KeyDecodeError::Empty));
        assert_eq!(StateKey::decode(&[0xEE]), Err(KeyDecodeError::UnknownTag(0xEE)));
        assert_eq!(
            StateKey::decode(&[KeyTag::Swap.as_u8(), b'a']),
            Err(KeyDecodeError::Truncated)
        );
        assert_eq!(
            StateKey::decode(&[KeyTag::Swap.as_u8(), 0x00, 0x07]),
            Err(KeyDecodeError::InvalidEscape(0x07))
        );
    }

    #[test]
    fn test_tag_roundtrip() {
        for tag in [KeyTag::Nonce, KeyTag::PassedNonce, KeyTag::MultiSwap] {
            assert_eq!(KeyTag::from_u8(tag.as_u8()), Some(tag));
        }
    }
}
