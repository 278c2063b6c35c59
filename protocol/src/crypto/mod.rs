//! # Cryptographic Primitives
//!
//! Only hashing is needed here: blocks are linked by SHA-256 digests and
//! nothing is signed.

pub mod hash;

pub use hash::{sha256_array, sha256_hex, sha256_hex_multi};
