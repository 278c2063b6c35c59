// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # linkchain Core Library
//!
//! A minimal distributed ledger: every node keeps an append-only chain of
//! hash-linked blocks and syncs it with its peers, adopting the longest
//! valid chain it hears about.
//!
//! ## Architecture
//!
//! - **config**: Genesis fields, default ports, peer link limits.
//! - **crypto**: SHA-256 helpers for block hashing.
//! - **storage**: Blocks, the validator, and the lock-guarded chain store.
//! - **network**: Protocol messages, the peer set, and the synchronizer.
//!
//! ## Scope
//!
//! No proof-of-work, no transactions, no persistence, no signatures. A
//! block's payload is an opaque string; anyone connected may mine.

pub mod config;
pub mod crypto;
pub mod network;
pub mod storage;
