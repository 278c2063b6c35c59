//! # Hashing Utilities
//!
//! Block hashes in linkchain are lowercase hex SHA-256 digests. Hex strings
//! rather than raw byte arrays keep blocks directly JSON-serializable and
//! comparable with peers that speak the same wire format.
//!
//! `sha256_hex_multi` feeds the parts into one hasher in order. For the block
//! preimage this is exactly `SHA-256(index ‖ previous_hash ‖ timestamp ‖ data)`
//! without building the concatenated string first.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash and return a fixed-size array.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute the SHA-256 hash of `data` as a lowercase hex string.
///
/// # Example
///
/// ```
/// use linkchain_protocol::crypto::sha256_hex;
///
/// let hash = sha256_hex(b"linkchain");
/// assert_eq!(hash.len(), 64);
/// ```
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256_array(data))
}

/// Hash multiple byte slices as if they were concatenated, returning hex.
///
/// The parts are fed sequentially into a single hasher, so
/// `sha256_hex_multi(&[a, b])` equals `sha256_hex(a ++ b)`.
pub fn sha256_hex_multi(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}
