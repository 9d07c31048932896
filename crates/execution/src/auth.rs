//! Sender authorization of client requests.
//!
//! A signed request travels as positional string arguments:
//!
//! ```text
//! request_id, contract, channel, arg_1 .. arg_n, nonce, key_1 .. key_k, sig_1 .. sig_k
//! ```
//!
//! Keys and signatures are hex encoded; an empty signature means the key
//! at the same position did not sign. The number of operation arguments
//! comes from the registry, so the trailing keys and signatures can be
//! split unambiguously.

use crate::AuthError;
use std::collections::HashMap;
use swapledger_types::{
    request_message, verify_threshold, Address, Hash, KeyPair, PublicKey, Signature,
    ThresholdError,
};

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub method: String,
    pub request_id: String,
    pub contract: String,
    pub channel: String,
    pub args: Vec<String>,
    pub nonce: u64,
    pub public_keys: Vec<PublicKey>,
    /// `signatures[i]` belongs to `public_keys[i]`.
    pub signatures: Vec<Option<Signature>>,
}

impl SignedRequest {
    /// An unsigned request; see [`SignedRequest::sign`].
    pub fn new(
        method: impl Into<String>,
        request_id: impl Into<String>,
        contract: impl Into<String>,
        channel: impl Into<String>,
        args: Vec<String>,
        nonce: u64,
    ) -> Self {
        Self {
            method: method.into(),
            request_id: request_id.into(),
            contract: contract.into(),
            channel: channel.into(),
            args,
            nonce,
            public_keys: Vec::new(),
            signatures: Vec::new(),
        }
    }

    /// Sign with every key pair. Replaces earlier keys and signatures.
    pub fn sign(mut self, signers: &[&KeyPair]) -> Self {
        self.public_keys = signers.iter().map(|signer| signer.public_key()).collect();
        let message = self.message();
        self.signatures = signers
            .iter()
            .map(|signer| Some(signer.sign(message.as_bytes())))
            .collect();
        self
    }

    /// Drop the signature at `index`, keeping its key.
    pub fn without_signature(mut self, index: usize) -> Self {
        if let Some(signature) = self.signatures.get_mut(index) {
            *signature = None;
        }
        self
    }

    /// Digest covered by the signatures.
    pub fn message(&self) -> Hash {
        request_message(
            &self.method,
            &self.request_id,
            &self.contract,
            &self.channel,
            &self.args,
            self.nonce,
            &self.public_keys,
        )
    }

    /// Decode the positional wire form of `method` with `arity` operation
    /// arguments.
    pub fn from_wire(method: &str, raw: &[String], arity: usize) -> Result<Self, AuthError> {
        let fixed = 3 + arity + 1;
        if raw.len() < fixed {
            return Err(AuthError::ArgumentCount);
        }

        let nonce_arg = &raw[fixed - 1];
        let nonce = nonce_arg
            .parse::<u64>()
            .map_err(|_| AuthError::NonceFormat(nonce_arg.clone()))?;

        let trailer = &raw[fixed..];
        if trailer.is_empty() {
            return Err(AuthError::NotSigned);
        }
        if trailer.len() % 2 != 0 {
            return Err(AuthError::KeyCount);
        }
        let (keys, signatures) = trailer.split_at(trailer.len() / 2);

        let public_keys = keys
            .iter()
            .map(|key| decode_key(key))
            .collect::<Result<Vec<_>, _>>()?;
        let signatures = signatures
            .iter()
            .map(|signature| decode_signature(signature))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            method: method.to_string(),
            request_id: raw[0].clone(),
            contract: raw[1].clone(),
            channel: raw[2].clone(),
            args: raw[3..3 + arity].to_vec(),
            nonce,
            public_keys,
            signatures,
        })
    }

    /// Encode as positional wire arguments.
    pub fn to_wire(&self) -> Vec<String> {
        let mut wire = Vec::with_capacity(4 + self.args.len() + 2 * self.public_keys.len());
        wire.push(self.request_id.clone());
        wire.push(self.contract.clone());
        wire.push(self.channel.clone());
        wire.extend(self.args.iter().cloned());
        wire.push(self.nonce.to_string());
        wire.extend(self.public_keys.iter().map(|key| hex::encode(key.as_bytes())));
        wire.extend(self.signatures.iter().map(|signature| {
            signature
                .as_ref()
                .map(|signature| hex::encode(signature.as_bytes()))
                .unwrap_or_default()
        }));
        wire
    }
}

fn decode_key(raw: &str) -> Result<PublicKey, AuthError> {
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(raw, &mut bytes).map_err(|_| AuthError::Encoding)?;
    Ok(PublicKey(bytes))
}

fn decode_signature(raw: &str) -> Result<Option<Signature>, AuthError> {
    if raw.is_empty() {
        return Ok(None);
    }
    let bytes = hex::decode(raw).map_err(|_| AuthError::Encoding)?;
    Ok(Some(Signature(bytes)))
}

/// What the access-control service knows about a set of keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    pub address: Address,
    /// Signatures required for a multisig account; `None` requires all.
    pub threshold: Option<usize>,
    pub black_listed: bool,
    pub gray_listed: bool,
}

impl AclEntry {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            threshold: None,
            black_listed: false,
            gray_listed: false,
        }
    }
}

/// Resolves signing keys to an account.
pub trait AccessControl: Send + Sync {
    fn resolve(&self, keys: &[PublicKey]) -> Result<AclEntry, AuthError>;
}

/// In-memory access control.
///
/// Every key set maps to the address derived from it; policies and list
/// flags are attached per address.
#[derive(Debug, Clone, Default)]
pub struct StaticAccessControl {
    policies: HashMap<Address, AclEntry>,
}

impl StaticAccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, address: Address) -> &mut AclEntry {
        self.policies
            .entry(address)
            .or_insert_with(|| AclEntry::new(address))
    }

    /// Require `threshold` signatures from the multisig account of `keys`.
    pub fn with_policy(mut self, keys: &[PublicKey], threshold: usize) -> Self {
        self.entry(Address::from_public_keys(keys)).threshold = Some(threshold);
        self
    }

    pub fn blacklist(mut self, address: Address) -> Self {
        self.entry(address).black_listed = true;
        self
    }

    pub fn graylist(mut self, address: Address) -> Self {
        self.entry(address).gray_listed = true;
        self
    }
}

impl AccessControl for StaticAccessControl {
    fn resolve(&self, keys: &[PublicKey]) -> Result<AclEntry, AuthError> {
        let address = Address::from_public_keys(keys);
        Ok(self
            .policies
            .get(&address)
            .cloned()
            .unwrap_or_else(|| AclEntry::new(address)))
    }
}

/// The sender and payload of a request that passed authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    pub sender: Address,
    pub nonce: u64,
    pub args: Vec<String>,
}

/// Check that `request` targets this contract and is signed by enough keys
/// of a permitted account.
///
/// A single key must sign. A multisig account needs its policy threshold,
/// or every key when it has none.
pub fn authorize(
    acl: &dyn AccessControl,
    request: SignedRequest,
    contract: &str,
    channel: &str,
) -> Result<Authorized, AuthError> {
    if request.contract != contract {
        return Err(AuthError::IncorrectContract);
    }
    if request.channel != channel {
        return Err(AuthError::IncorrectChannel);
    }
    if request.public_keys.is_empty() {
        return Err(AuthError::NotSigned);
    }

    let entry = acl.resolve(&request.public_keys)?;
    if entry.black_listed {
        return Err(AuthError::Blacklisted(entry.address));
    }
    if entry.gray_listed {
        return Err(AuthError::Graylisted(entry.address));
    }

    let threshold = match request.public_keys.len() {
        1 => 1,
        all => entry.threshold.unwrap_or(all),
    };
    let message = request.message();
    verify_threshold(
        message.as_bytes(),
        &request.public_keys,
        &request.signatures,
        threshold,
    )
    .map_err(|err| match err {
        ThresholdError::LengthMismatch => AuthError::KeyCount,
        ThresholdError::InvalidSignature { .. } => AuthError::IncorrectSignature,
        ThresholdError::NotEnoughSignatures { .. } => AuthError::PolicyNotSatisfied,
    })?;

    Ok(Authorized {
        sender: entry.address,
        nonce: request.nonce,
        args: request.args,
    })
}
