//! # Peer Set
//!
//! The live set of peer links. Each link is a bounded outbound queue that a
//! transport task drains onto the actual connection; the core never touches
//! sockets. `PeerSet` is the only way protocol messages leave the core,
//! whether addressed to one peer or broadcast to all of them.
//!
//! ## Delivery
//!
//! Sends use `try_send`, so they never block or await. When a peer's queue
//! is full the message is dropped for that peer alone and a warning is
//! logged; other peers are unaffected.
//!
//! ## Disconnects
//!
//! [`PeerSet::remove`] is idempotent. A transport may call it from both its
//! read side and its write side when a connection dies; only the first call
//! returns the peer and logs the disconnect.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config;
use crate::network::message::Message;

// ---------------------------------------------------------------------------
// Peer Identity
// ---------------------------------------------------------------------------

/// Opaque identifier of one peer connection. A peer that reconnects gets a
/// fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(Uuid);

impl PeerId {
    /// Generate a new random peer id.
    pub fn new() -> Self {
        PeerId(Uuid::new_v4())
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Information about a connected peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    /// Connection identifier.
    pub id: PeerId,
    /// Remote address as reported by the transport (e.g. "10.0.0.2:6001").
    pub address: String,
    /// Unix timestamp (milliseconds) when the link was registered.
    pub connected_at: u64,
}

// ---------------------------------------------------------------------------
// PeerLink
// ---------------------------------------------------------------------------

/// Outbound half of a peer connection as seen by the core.
#[derive(Debug, Clone)]
pub struct PeerLink {
    info: PeerInfo,
    outbox: mpsc::Sender<Message>,
}

impl PeerLink {
    /// Peer metadata.
    pub fn info(&self) -> &PeerInfo {
        &self.info
    }

    /// Queue `message` for delivery without waiting. Returns whether it was
    /// queued.
    pub fn send(&self, message: Message) -> bool {
        match self.outbox.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                warn!(
                    peer = %self.info.id,
                    address = %self.info.address,
                    kind = message.kind(),
                    "peer outbox full, dropping message"
                );
                false
            }
            Err(TrySendError::Closed(message)) => {
                debug!(
                    peer = %self.info.id,
                    kind = message.kind(),
                    "peer outbox closed, dropping message"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PeerSet
// ---------------------------------------------------------------------------

/// Lock-guarded map of live peer links.
#[derive(Debug, Default)]
pub struct PeerSet {
    links: RwLock<HashMap<PeerId, PeerLink>>,
}

impl PeerSet {
    /// Creates an empty peer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new peer with the default outbox capacity.
    ///
    /// Returns the peer's id and the receiving end of its outbox, which the
    /// transport drains onto the connection.
    pub fn register(&self, address: impl Into<String>) -> (PeerId, mpsc::Receiver<Message>) {
        self.register_with_capacity(address, config::PEER_OUTBOX_CAPACITY)
    }

    /// Registers a new peer with an explicit outbox capacity (at least 1).
    pub fn register_with_capacity(
        &self,
        address: impl Into<String>,
        capacity: usize,
    ) -> (PeerId, mpsc::Receiver<Message>) {
        let (outbox, inbox) = mpsc::channel(capacity.max(1));
        let info = PeerInfo {
            id: PeerId::new(),
            address: address.into(),
            connected_at: chrono::Utc::now().timestamp_millis().max(0) as u64,
        };
        let id = info.id;

        info!(peer = %id, address = %info.address, "peer connected");
        self.links.write().insert(id, PeerLink { info, outbox });
        (id, inbox)
    }

    /// Removes a peer. Returns its info on the first call for a given id and
    /// `None` on every later call.
    pub fn remove(&self, id: PeerId) -> Option<PeerInfo> {
        let removed = self.links.write().remove(&id).map(|link| link.info);
        if let Some(info) = &removed {
            info!(peer = %id, address = %info.address, "peer disconnected");
        }
        removed
    }

    /// Queue `message` for a single peer. Returns false if the peer is gone
    /// or its outbox is full.
    pub fn send(&self, id: PeerId, message: Message) -> bool {
        let link = self.links.read().get(&id).cloned();
        match link {
            Some(link) => link.send(message),
            None => {
                debug!(peer = %id, kind = message.kind(), "send to unknown peer ignored");
                false
            }
        }
    }

    /// Queue `message` for every connected peer. Returns how many peers
    /// accepted it.
    ///
    /// Iterates a snapshot of the links, so a concurrent disconnect cannot
    /// invalidate the iteration.
    pub fn broadcast(&self, message: Message) -> usize {
        let links: Vec<PeerLink> = self.links.read().values().cloned().collect();
        debug!(kind = message.kind(), peers = links.len(), "broadcasting");
        links
            .iter()
            .filter(|link| link.send(message.clone()))
            .count()
    }

    /// Number of connected peers.
    pub fn len(&self) -> usize {
        self.links.read().len()
    }

    /// Whether no peers are connected.
    pub fn is_empty(&self) -> bool {
        self.links.read().is_empty()
    }

    /// Metadata for every connected peer, oldest first.
    pub fn list(&self) -> Vec<PeerInfo> {
        let mut peers: Vec<PeerInfo> = self
            .links
            .read()
            .values()
            .map(|link| link.info.clone())
            .collect();
        peers.sort_by_key(|p| p.connected_at);
        peers
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
