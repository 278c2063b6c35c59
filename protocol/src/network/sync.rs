//! # Chain Synchronization
//!
//! The peer reconciliation protocol. A node pulls state from its peers and
//! converges on the longest valid chain it hears about.
//!
//! ## Protocol Overview
//!
//! ```text
//! Node                                Peer
//! ────                                ────
//!   │  QueryLatest       (on connect)  │
//!   │────────────────────────────────> │
//!   │  ChainData [tip]                 │
//!   │<──────────────────────────────── │
//!   │                                  │
//!   │  tip extends ours?   append + broadcast [tip]
//!   │  single unknown tip? ──QueryAll──>
//!   │  ChainData [full chain]          │
//!   │<──────────────────────────────── │
//!   │  longer + valid?     replace + broadcast [new tip]
//! ```
//!
//! ## Reconciliation
//!
//! On receipt of `ChainData`, the blocks are sorted by index and the
//! highest one is compared with the local tip:
//!
//! 1. Not higher than ours: ignore. Equal height with a different hash is
//!    deliberately left alone; only strictly longer chains win.
//! 2. Builds directly on our tip: append it and propagate it.
//! 3. A lone block we cannot attach: ask that peer for its full chain.
//! 4. Several blocks we cannot attach: try to replace our chain with them.
//!
//! The cases are ordered from cheapest to costliest, so a one-block append
//! never pays for a full-chain revalidation.
//!
//! ## Statelessness
//!
//! The `Synchronizer` holds no protocol state of its own. Everything it
//! knows is in the [`ChainStore`]; each call is a reaction to one event.
//! Transport is the caller's problem: messages go out through the
//! [`PeerSet`] and come in through [`Synchronizer::on_message`].

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::network::message::Message;
use crate::network::peers::{PeerId, PeerSet};
use crate::storage::block::Block;
use crate::storage::chain::{ChainError, ChainStore};

// ---------------------------------------------------------------------------
// Reconciliation Outcome
// ---------------------------------------------------------------------------

/// What happened as a result of one inbound message.
///
/// Returned so that callers can log or count outcomes without inspecting
/// the store themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// A query was answered.
    Replied,
    /// The peer is not ahead of us (or sent nothing usable); nothing changed.
    Ignored,
    /// The peer's tip extended our chain and was appended.
    Appended,
    /// The peer's tip did not attach; its full chain was requested.
    RequestedFullChain,
    /// Our chain was replaced by the peer's longer valid chain.
    Replaced,
    /// The peer's block or chain failed validation; nothing changed.
    Rejected,
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

/// Reacts to peer and local events by consulting and updating the chain.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    chain: Arc<ChainStore>,
    peers: Arc<PeerSet>,
}

impl Synchronizer {
    /// Wires a synchronizer to a chain store and peer set.
    pub fn new(chain: Arc<ChainStore>, peers: Arc<PeerSet>) -> Self {
        Self { chain, peers }
    }

    /// The chain store this synchronizer drives.
    pub fn chain(&self) -> &Arc<ChainStore> {
        &self.chain
    }

    /// The peer set this synchronizer sends through.
    pub fn peers(&self) -> &Arc<PeerSet> {
        &self.peers
    }

    /// A peer just connected: ask for its latest block.
    ///
    /// Bootstrap is pull-only; nothing about local state is pushed.
    pub fn on_connect(&self, peer: PeerId) {
        self.peers.send(peer, Message::QueryLatest);
    }

    /// Handle one message from `peer`.
    ///
    /// Only a broken local store ([`ChainError::EmptyChain`]) is returned as
    /// an error; every problem with the peer's data is a
    /// [`Reconciliation::Rejected`] or [`Reconciliation::Ignored`] outcome.
    pub fn on_message(
        &self,
        peer: PeerId,
        message: Message,
    ) -> Result<Reconciliation, ChainError> {
        match message {
            Message::QueryLatest => {
                let latest = self.chain.latest()?;
                self.peers.send(peer, Message::latest(latest));
                Ok(Reconciliation::Replied)
            }
            Message::QueryAll => {
                let blocks = self.chain.snapshot();
                self.peers.send(peer, Message::ChainData { blocks });
                Ok(Reconciliation::Replied)
            }
            Message::ChainData { blocks } => self.reconcile(peer, blocks),
        }
    }

    /// A block was mined locally with `data` as payload.
    ///
    /// Produces and appends the block, then broadcasts it. A failure here
    /// means this node built a block its own validator rejects; it is logged
    /// as an error and returned, never swallowed.
    pub fn on_local_block_mined(&self, data: impl Into<String>) -> Result<Block, ChainError> {
        match self.chain.commit_next(data) {
            Ok(block) => {
                info!(index = block.index(), hash = %block.hash(), "block mined");
                self.peers.broadcast(Message::latest(block.clone()));
                Ok(block)
            }
            Err(e) => {
                error!(error = %e, "locally produced block failed validation");
                Err(e)
            }
        }
    }

    /// The `ChainData` branch of the protocol.
    fn reconcile(
        &self,
        peer: PeerId,
        mut blocks: Vec<Block>,
    ) -> Result<Reconciliation, ChainError> {
        // Peer ordering is not trusted.
        blocks.sort_by_key(Block::index);

        let Some(peer_top) = blocks.last().cloned() else {
            warn!(peer = %peer, "received empty chain data, ignoring");
            return Ok(Reconciliation::Ignored);
        };
        let local_top = self.chain.latest()?;

        if peer_top.index() <= local_top.index() {
            debug!(
                peer = %peer,
                local = local_top.index(),
                remote = peer_top.index(),
                "peer chain is not longer, doing nothing"
            );
            return Ok(Reconciliation::Ignored);
        }

        info!(
            peer = %peer,
            local = local_top.index(),
            remote = peer_top.index(),
            "chain possibly behind"
        );

        if local_top.hash() == peer_top.previous_hash() {
            return Ok(match self.chain.append(peer_top.clone()) {
                Ok(()) => {
                    info!(index = peer_top.index(), "appended block from peer");
                    self.peers.broadcast(Message::latest(peer_top));
                    Reconciliation::Appended
                }
                Err(e) => {
                    warn!(peer = %peer, error = %e, "peer block rejected");
                    Reconciliation::Rejected
                }
            });
        }

        if blocks.len() == 1 {
            debug!(peer = %peer, "single unattached block, querying full chain");
            self.peers.send(peer, Message::QueryAll);
            return Ok(Reconciliation::RequestedFullChain);
        }

        match self.chain.replace(blocks) {
            Ok(()) => {
                let latest = self.chain.latest()?;
                self.peers.broadcast(Message::latest(latest));
                Ok(Reconciliation::Replaced)
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "received chain rejected");
                Ok(Reconciliation::Rejected)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
