//! Domain-separated signing messages for client requests.
//!
//! A client signs the SHA3-256 digest of the operation name followed by every
//! request field except the signatures themselves:
//!
//! `method ‖ request_id ‖ contract ‖ channel ‖ args… ‖ nonce ‖ public_keys…`
//!
//! The operation name doubles as the domain tag, so a signature for one
//! operation can never be replayed as another.

use crate::{Hash, PublicKey};

/// Build the signing digest for a client request.
///
/// Public keys are hex-encoded so the digest only depends on textual fields.
pub fn request_message(
    method: &str,
    request_id: &str,
    contract: &str,
    channel: &str,
    args: &[String],
    nonce: u64,
    public_keys: &[PublicKey],
) -> Hash {
    let nonce = nonce.to_string();
    let keys: Vec<String> = public_keys
        .iter()
        .map(|key| hex::encode(key.as_bytes()))
        .collect();

    let mut parts: Vec<&[u8]> = Vec::with_capacity(5 + args.len() + keys.len());
    parts.push(method.as_bytes());
    parts.push(request_id.as_bytes());
    parts.push(contract.as_bytes());
    parts.push(channel.as_bytes());
    parts.extend(args.iter().map(|arg| arg.as_bytes()));
    parts.push(nonce.as_bytes());
    parts.extend(keys.iter().map(|key| key.as_bytes()));

    Hash::from_parts(&parts)
}
