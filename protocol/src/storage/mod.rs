//! # Storage Module
//!
//! The in-memory ledger. There is no persistence: the chain lives as long as
//! the process and is rebuilt from peers after a restart.
//!
//! ## Architecture
//!
//! ```text
//! block.rs      Block structure and genesis construction
//! validator.rs  Pure hashing, successor and whole-chain checks
//! chain.rs      Lock-guarded ChainStore: append, replace, produce
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! local mine ──► ChainStore::commit_next ──┐
//!                                          ├─► validator ─► Vec<Block>
//! peer block ──► ChainStore::append ───────┤
//! peer chain ──► ChainStore::replace ──────┘
//! ```

pub mod block;
pub mod chain;
pub mod validator;

pub use block::Block;
pub use chain::{ChainError, ChainStore};
pub use validator::{
    check_chain, check_successor, hash_of, is_valid_chain, is_valid_successor, BlockRejection,
    ChainRejection,
};
