//! # Block & Chain Validation
//!
//! Pure functions that decide whether a block may follow another and whether
//! a whole chain is acceptable. Nothing in here touches shared state, so the
//! same input always yields the same verdict.
//!
//! Every check comes in two flavours:
//!
//! - `check_*` returns a `Result` whose error names the exact rule that
//!   failed, for logging and metrics.
//! - `is_valid_*` collapses that into a `bool` for callers that only need
//!   the verdict.
//!
//! A failed check is never a panic: peer-supplied blocks are untrusted by
//! default, and rejecting them is routine.

use thiserror::Error;
use tracing::debug;

use crate::crypto::hash::sha256_hex_multi;
use crate::storage::block::Block;

// ---------------------------------------------------------------------------
// Rejection Reasons
// ---------------------------------------------------------------------------

/// Why a candidate block cannot follow its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockRejection {
    /// The candidate's index is not `previous.index + 1`.
    #[error("invalid index: expected {expected}, got {got}")]
    IndexMismatch { expected: u64, got: u64 },

    /// The candidate's `previous_hash` is not the predecessor's hash.
    #[error("invalid previous hash: expected {expected}, got {got}")]
    LinkMismatch { expected: String, got: String },

    /// The candidate's stored hash does not match its recomputed hash.
    #[error("invalid hash: computed {computed}, stored {stored}")]
    HashMismatch { computed: String, stored: String },
}

/// Why a candidate chain was not adopted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainRejection {
    /// The chain has no blocks at all.
    #[error("chain is empty")]
    Empty,

    /// The first block is not the canonical genesis block.
    #[error("first block does not match genesis")]
    GenesisMismatch,

    /// The block at `position` failed the successor check.
    #[error("block at position {position} is invalid: {reason}")]
    InvalidBlock {
        position: usize,
        reason: BlockRejection,
    },

    /// The chain is valid but not strictly longer than the local one.
    #[error("chain of length {candidate} is not longer than local length {current}")]
    NotLonger { candidate: usize, current: usize },
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Compute a block's content hash.
///
/// Lowercase hex SHA-256 over `index ‖ previous_hash ‖ timestamp ‖ data`,
/// with the integers in decimal. The field order matters.
pub fn hash_of(index: u64, previous_hash: &str, timestamp: u64, data: &str) -> String {
    let index = index.to_string();
    let timestamp = timestamp.to_string();
    sha256_hex_multi(&[
        index.as_bytes(),
        previous_hash.as_bytes(),
        timestamp.as_bytes(),
        data.as_bytes(),
    ])
}

// ---------------------------------------------------------------------------
// Single-Block Checks
// ---------------------------------------------------------------------------

/// Check that `candidate` directly extends `previous`.
///
/// The rules are applied in order: index, then link, then hash. The first
/// one that fails is reported.
pub fn check_successor(candidate: &Block, previous: &Block) -> Result<(), BlockRejection> {
    let expected_index = previous.index().checked_add(1);
    if expected_index != Some(candidate.index()) {
        return Err(BlockRejection::IndexMismatch {
            expected: expected_index.unwrap_or(u64::MAX),
            got: candidate.index(),
        });
    }

    if candidate.previous_hash() != previous.hash() {
        return Err(BlockRejection::LinkMismatch {
            expected: previous.hash().to_string(),
            got: candidate.previous_hash().to_string(),
        });
    }

    let computed = candidate.compute_hash();
    if computed != candidate.hash() {
        return Err(BlockRejection::HashMismatch {
            computed,
            stored: candidate.hash().to_string(),
        });
    }

    Ok(())
}

/// Boolean form of [`check_successor`]. Logs the failing rule at `debug`.
pub fn is_valid_successor(candidate: &Block, previous: &Block) -> bool {
    match check_successor(candidate, previous) {
        Ok(()) => true,
        Err(reason) => {
            debug!(index = candidate.index(), %reason, "block rejected");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Whole-Chain Checks
// ---------------------------------------------------------------------------

/// Check an entire chain from genesis.
///
/// The first block must be structurally equal to [`Block::genesis`], and
/// every later block must pass [`check_successor`] against the one before.
/// Stops at the first failure.
pub fn check_chain(chain: &[Block]) -> Result<(), ChainRejection> {
    let first = chain.first().ok_or(ChainRejection::Empty)?;
    if !first.is_genesis() {
        return Err(ChainRejection::GenesisMismatch);
    }

    for (position, pair) in chain.windows(2).enumerate() {
        check_successor(&pair[1], &pair[0]).map_err(|reason| ChainRejection::InvalidBlock {
            position: position + 1,
            reason,
        })?;
    }

    Ok(())
}

/// Boolean form of [`check_chain`]. Logs the failure at `debug`.
pub fn is_valid_chain(chain: &[Block]) -> bool {
    match check_chain(chain) {
        Ok(()) => true,
        Err(reason) => {
            debug!(length = chain.len(), %reason, "chain rejected");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
