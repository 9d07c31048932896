//! Ed25519 key pairs, signatures and threshold verification.
//!
//! Client requests are signed by one key or, for multisig accounts, by
//! several keys of which a policy-defined number must be present.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An Ed25519 key pair for signing.
#[derive(Clone)]
pub struct KeyPair(ed25519_dalek::SigningKey);

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        KeyPair(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Generate a keypair from a seed (for testing/simulation).
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        KeyPair(ed25519_dalek::SigningKey::from_bytes(seed))
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        Signature(self.0.sign(message).to_bytes().to_vec())
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({:?})", self.public_key())
    }
}

/// An Ed25519 public key (32 bytes).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "hex_bytes32")] pub [u8; 32]);

impl PublicKey {
    /// Verify a signature.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        use ed25519_dalek::Verifier;
        let pk = match ed25519_dalek::VerifyingKey::from_bytes(&self.0) {
            Ok(pk) => pk,
            Err(_) => return false,
        };
        let sig_array: [u8; 64] = match signature.0.as_slice().try_into() {
            Ok(arr) => arr,
            Err(_) => return false,
        };
        let sig = ed25519_dalek::Signature::from_bytes(&sig_array);
        pk.verify(message, &sig).is_ok()
    }

    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &hex::encode(self.0)[..16])
    }
}

/// An Ed25519 signature (64 bytes).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "hex::serde")] pub Vec<u8>);

impl Signature {
    /// Create a zero/placeholder signature for testing.
    pub fn zero() -> Self {
        Signature(vec![0u8; 64])
    }

    /// Get signature as byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(&self.0);
        write!(f, "Signature({}..)", &hex[..hex.len().min(16)])
    }
}

/// Outcome of a threshold check that did not pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThresholdError {
    /// Key and signature lists have different lengths.
    #[error("incorrect number of keys or signs")]
    LengthMismatch,

    /// A present signature failed verification.
    #[error("incorrect signature")]
    InvalidSignature {
        /// Position of the offending key.
        index: usize,
    },

    /// Fewer valid signatures than required.
    #[error("signature policy isn't satisfied: {present} of {required}")]
    NotEnoughSignatures {
        /// Valid signatures present.
        present: usize,
        /// Signatures required.
        required: usize,
    },
}

/// Verify that at least `threshold` of the given keys signed `message`.
///
/// `signatures[i]` belongs to `keys[i]`; `None` means that key did not sign.
/// Every signature that is present must be valid, even past the threshold.
pub fn verify_threshold(
    message: &[u8],
    keys: &[PublicKey],
    signatures: &[Option<Signature>],
    threshold: usize,
) -> Result<usize, ThresholdError> {
    if keys.len() != signatures.len() {
        return Err(ThresholdError::LengthMismatch);
    }

    let mut present = 0;
    for (index, (key, signature)) in keys.iter().zip(signatures).enumerate() {
        let Some(signature) = signature else {
            continue;
        };
        if !key.verify(message, signature) {
            return Err(ThresholdError::InvalidSignature { index });
        }
        present += 1;
    }

    if present < threshold {
        return Err(ThresholdError::NotEnoughSignatures {
            present,
            required: threshold,
        });
    }
    Ok(present)
}

mod hex_bytes32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut out = [0u8; 32];
        hex::decode_to_slice(&s, &mut out).map_err(serde::de::Error::custom)?;
        Ok(out)
    }
}
