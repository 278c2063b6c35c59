//! # Block Structure
//!
//! A block is the atomic unit of the ledger: an index, a link to the
//! previous block's hash, a timestamp, an opaque payload, and its own hash.
//!
//! ## Block Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Block                                      │
//! │  ├── index: u64          (genesis = 0)      │
//! │  ├── previous_hash: String                  │
//! │  ├── timestamp: u64      (unix seconds)     │
//! │  ├── data: String        (opaque payload)   │
//! │  └── hash: String        (hex SHA-256)      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Hash Computation
//!
//! The block hash covers `index || previous_hash || timestamp || data`, each
//! field in its decimal/textual form, in that order. See
//! [`validator::hash_of`](super::validator::hash_of).
//!
//! Fields are private: a block never changes after construction. Blocks
//! built locally go through [`Block::new`], which derives the hash. Blocks
//! arriving from peers are deserialized as-is and must pass the validator
//! before anything trusts them.

use serde::{Deserialize, Serialize};

use crate::config;
use crate::storage::validator::hash_of;

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A single hash-linked ledger entry.
///
/// Serialized with camelCase field names
/// (`index`, `previousHash`, `timestamp`, `data`, `hash`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    index: u64,
    previous_hash: String,
    timestamp: u64,
    data: String,
    hash: String,
}

impl Block {
    /// Construct the genesis block.
    ///
    /// Every field is fixed (see [`config`]), and the hash is recomputed
    /// from those fields on each call instead of being stored as a
    /// constant, so the two can never drift apart.
    pub fn genesis() -> Self {
        Self::new(
            config::GENESIS_INDEX,
            config::GENESIS_PREVIOUS_HASH,
            config::GENESIS_TIMESTAMP,
            config::GENESIS_DATA,
        )
    }

    /// Construct a block from its content fields, deriving the hash.
    pub fn new(
        index: u64,
        previous_hash: impl Into<String>,
        timestamp: u64,
        data: impl Into<String>,
    ) -> Self {
        let previous_hash = previous_hash.into();
        let data = data.into();
        let hash = hash_of(index, &previous_hash, timestamp, &data);

        Block {
            index,
            previous_hash,
            timestamp,
            data,
            hash,
        }
    }

    /// Construct the block that directly extends `parent`.
    pub fn next(parent: &Block, timestamp: u64, data: impl Into<String>) -> Self {
        Self::new(parent.index + 1, parent.hash.clone(), timestamp, data)
    }

    /// Assemble a block from all five fields without deriving anything.
    ///
    /// Nothing is checked. This is how untrusted blocks (and deliberately
    /// broken test fixtures) come into existence; run them through the
    /// validator before use.
    pub fn from_parts(
        index: u64,
        previous_hash: impl Into<String>,
        timestamp: u64,
        data: impl Into<String>,
        hash: impl Into<String>,
    ) -> Self {
        Block {
            index,
            previous_hash: previous_hash.into(),
            timestamp,
            data: data.into(),
            hash: hash.into(),
        }
    }

    /// Position of this block in its chain.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Hash of the preceding block (`"0"` for genesis).
    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    /// Creation time in seconds since the Unix epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Opaque payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Stored hash of this block.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Recompute the hash from the content fields.
    ///
    /// Equal to [`Block::hash`] for every well-formed block.
    pub fn compute_hash(&self) -> String {
        hash_of(self.index, &self.previous_hash, self.timestamp, &self.data)
    }

    /// Whether this block is structurally identical to the genesis block.
    pub fn is_genesis(&self) -> bool {
        *self == Self::genesis()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
