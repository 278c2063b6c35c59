//! # Chain Store
//!
//! The node's single copy of the ledger. The store starts with the genesis
//! block and changes in exactly two ways:
//!
//! - **append**: one block that directly extends the current tip;
//! - **replace**: a wholesale swap for a strictly longer valid chain.
//!
//! ## Thread Safety
//!
//! The block vector sits behind a `parking_lot::RwLock` owned by the store.
//! Every mutation takes the write lock and re-reads the tip under it, so two
//! writers (two peers reconciling, or a peer racing a local mine) can never
//! both build on the same tip. Readers get owned copies, so a snapshot taken
//! for a broadcast stays consistent even while a writer appends afterwards.

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info};

use crate::storage::block::Block;
use crate::storage::validator::{check_chain, check_successor, BlockRejection, ChainRejection};

// ---------------------------------------------------------------------------
// ChainError
// ---------------------------------------------------------------------------

/// Errors returned by [`ChainStore`] operations.
///
/// `RejectedBlock` and `RejectedChain` are routine outcomes of processing
/// untrusted input. `EmptyChain` and `InvariantViolation` mean the node
/// itself is broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The store holds no blocks. Unreachable while genesis fixation holds.
    #[error("chain store is empty")]
    EmptyChain,

    /// A candidate block did not extend the current tip.
    #[error("block rejected: {0}")]
    RejectedBlock(#[from] BlockRejection),

    /// A candidate chain was invalid or not longer than the local chain.
    #[error("chain rejected: {0}")]
    RejectedChain(#[from] ChainRejection),

    /// A block this node produced failed its own validation. Indicates a
    /// bug in hashing or block construction, never bad peer input.
    #[error("local invariant violated: produced block {index} failed validation: {reason}")]
    InvariantViolation { index: u64, reason: BlockRejection },
}

// ---------------------------------------------------------------------------
// ChainStore
// ---------------------------------------------------------------------------

/// Ordered, lock-guarded sequence of validated blocks.
#[derive(Debug)]
pub struct ChainStore {
    blocks: RwLock<Vec<Block>>,
}

impl Default for ChainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainStore {
    /// Creates a store holding only the genesis block.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(vec![Block::genesis()]),
        }
    }

    /// Returns a copy of the current tip.
    pub fn latest(&self) -> Result<Block, ChainError> {
        self.blocks.read().last().cloned().ok_or(ChainError::EmptyChain)
    }

    /// Returns a consistent copy of the whole chain.
    pub fn snapshot(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }

    /// Number of blocks in the chain, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// Always false once the store is constructed.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    /// Appends `candidate` if it directly extends the current tip.
    ///
    /// On rejection the store is untouched and the reason is returned; the
    /// caller decides whether it is worth logging.
    pub fn append(&self, candidate: Block) -> Result<(), ChainError> {
        let mut blocks = self.blocks.write();
        let tip = blocks.last().ok_or(ChainError::EmptyChain)?;
        check_successor(&candidate, tip)?;

        debug!(index = candidate.index(), hash = %candidate.hash(), "block appended");
        blocks.push(candidate);
        Ok(())
    }

    /// Swaps the entire chain for `candidate` if it is valid from genesis and
    /// strictly longer than the current chain.
    ///
    /// Equal length is never enough. The candidate is validated before the
    /// write lock is taken (its validity does not depend on local state);
    /// only the length comparison and swap happen under the lock.
    pub fn replace(&self, candidate: Vec<Block>) -> Result<(), ChainError> {
        check_chain(&candidate)?;

        let mut blocks = self.blocks.write();
        if candidate.len() <= blocks.len() {
            return Err(ChainRejection::NotLonger {
                candidate: candidate.len(),
                current: blocks.len(),
            }
            .into());
        }

        info!(
            old_length = blocks.len(),
            new_length = candidate.len(),
            "replacing local chain with longer valid chain"
        );
        *blocks = candidate;
        Ok(())
    }

    /// Builds the block that would extend the current tip, stamped with the
    /// current time. Does NOT append it.
    pub fn produce_next(&self, data: impl Into<String>) -> Result<Block, ChainError> {
        let tip = self.latest()?;
        Ok(Block::next(&tip, unix_now(), data))
    }

    /// Produces and appends the next block under one write lock.
    ///
    /// Because the tip cannot move between production and appension, a
    /// failed check here is always a local bug and is reported as
    /// [`ChainError::InvariantViolation`].
    pub fn commit_next(&self, data: impl Into<String>) -> Result<Block, ChainError> {
        let mut blocks = self.blocks.write();
        let tip = blocks.last().ok_or(ChainError::EmptyChain)?;
        let candidate = Block::next(tip, unix_now(), data);

        check_successor(&candidate, tip).map_err(|reason| ChainError::InvariantViolation {
            index: candidate.index(),
            reason,
        })?;

        blocks.push(candidate.clone());
        Ok(candidate)
    }
}

/// Current wall-clock time in whole seconds since the Unix epoch.
fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
