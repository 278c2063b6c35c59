//! # Protocol Configuration & Constants
//!
//! Every fixed value the ledger depends on lives here: the genesis block
//! fields, default ports, and the limits applied to peer links.
//!
//! The genesis fields are consensus-critical. Two nodes with different
//! genesis constants will reject each other's chains outright, since
//! `is_valid_chain` compares the first block structurally.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The protocol version string reported by the node.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Genesis Block
// ---------------------------------------------------------------------------

/// Index of the genesis block. Every chain starts here.
pub const GENESIS_INDEX: u64 = 0;

/// Sentinel stored in the genesis block's `previous_hash` field.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Genesis timestamp, in seconds since the Unix epoch (2016-06-05).
pub const GENESIS_TIMESTAMP: u64 = 1_465_154_705;

/// Genesis payload.
pub const GENESIS_DATA: &str = "Genesis";

// ---------------------------------------------------------------------------
// Networking
// ---------------------------------------------------------------------------

/// Default port for the HTTP API.
pub const DEFAULT_HTTP_PORT: u16 = 3001;

/// Default port for the TCP peer listener.
pub const DEFAULT_P2P_PORT: u16 = 6001;

/// Capacity of each peer's outbound queue. When a peer falls this far
/// behind, further messages to it are dropped instead of blocking the
/// sender.
pub const PEER_OUTBOX_CAPACITY: usize = 256;

/// Largest wire frame (one JSON message, not counting its newline) accepted
/// from a peer. A peer exceeding it is disconnected.
///
/// This also caps what a node can send: a full-chain reply larger than this
/// is not sent, so a chain of roughly 60k blocks with short payloads (about
/// 250 bytes each once double-encoded) can no longer be served to peers
/// that query it in full.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;
