//! # Network Module
//!
//! The peer side of the ledger: the message envelope, the set of live peer
//! links, and the reconciliation protocol that decides what to do with a
//! peer's chain.
//!
//! ## Architecture
//!
//! ```text
//! message.rs  Closed protocol enum and its JSON wire codec
//! peers.rs    Lock-guarded set of bounded per-peer outboxes
//! sync.rs     Synchronizer: connect / message / local-mine reactions
//! ```
//!
//! This crate stays transport-agnostic. The node binary owns the sockets,
//! decodes frames into [`Message`]s, and drains each peer's outbox onto its
//! connection.

pub mod message;
pub mod peers;
pub mod sync;

pub use message::{Message, ProtocolError};
pub use peers::{PeerId, PeerInfo, PeerLink, PeerSet};
pub use sync::{Reconciliation, Synchronizer};
