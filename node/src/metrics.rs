//! # Prometheus Metrics
//!
//! Operational metrics for the node, scraped at `GET /metrics`.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] with
//! the `linkchain` namespace, so they never collide with the default global
//! registry (and tests can create as many as they like).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

use linkchain_protocol::network::{Reconciliation, Synchronizer};

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Current chain length, genesis included.
    pub chain_height: IntGauge,
    /// Number of currently connected peers.
    pub connected_peers: IntGauge,
    /// Blocks mined locally.
    pub blocks_mined_total: IntCounter,
    /// Peer blocks appended directly onto the local tip.
    pub blocks_appended_total: IntCounter,
    /// Times the local chain was replaced by a longer peer chain.
    pub chain_replacements_total: IntCounter,
    /// Full-chain requests sent after an unattached block.
    pub full_chain_requests_total: IntCounter,
    /// Peer messages that were malformed or failed validation.
    pub rejected_messages_total: IntCounter,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("linkchain".into()), None)
            .expect("failed to create prometheus registry");

        let chain_height = IntGauge::new("chain_height", "Number of blocks in the local chain")
            .expect("metric creation");
        registry
            .register(Box::new(chain_height.clone()))
            .expect("metric registration");

        let connected_peers = IntGauge::new("connected_peers", "Number of connected peers")
            .expect("metric creation");
        registry
            .register(Box::new(connected_peers.clone()))
            .expect("metric registration");

        let blocks_mined_total =
            IntCounter::new("blocks_mined_total", "Total number of blocks mined locally")
                .expect("metric creation");
        registry
            .register(Box::new(blocks_mined_total.clone()))
            .expect("metric registration");

        let blocks_appended_total = IntCounter::new(
            "blocks_appended_total",
            "Total number of peer blocks appended onto the local tip",
        )
        .expect("metric creation");
        registry
            .register(Box::new(blocks_appended_total.clone()))
            .expect("metric registration");

        let chain_replacements_total = IntCounter::new(
            "chain_replacements_total",
            "Total number of times the local chain was replaced by a longer one",
        )
        .expect("metric creation");
        registry
            .register(Box::new(chain_replacements_total.clone()))
            .expect("metric registration");

        let full_chain_requests_total = IntCounter::new(
            "full_chain_requests_total",
            "Total number of full-chain queries sent to peers",
        )
        .expect("metric creation");
        registry
            .register(Box::new(full_chain_requests_total.clone()))
            .expect("metric registration");

        let rejected_messages_total = IntCounter::new(
            "rejected_messages_total",
            "Total number of peer messages that were malformed or invalid",
        )
        .expect("metric creation");
        registry
            .register(Box::new(rejected_messages_total.clone()))
            .expect("metric registration");

        Self {
            registry,
            chain_height,
            connected_peers,
            blocks_mined_total,
            blocks_appended_total,
            chain_replacements_total,
            full_chain_requests_total,
            rejected_messages_total,
        }
    }

    /// Counts the outcome of one inbound peer message.
    pub fn record(&self, outcome: Reconciliation) {
        match outcome {
            Reconciliation::Appended => self.blocks_appended_total.inc(),
            Reconciliation::Replaced => self.chain_replacements_total.inc(),
            Reconciliation::RequestedFullChain => self.full_chain_requests_total.inc(),
            Reconciliation::Rejected => self.rejected_messages_total.inc(),
            Reconciliation::Replied | Reconciliation::Ignored => {}
        }
    }

    /// Refreshes the gauges from the current node state.
    pub fn observe(&self, sync: &Synchronizer) {
        self.chain_height.set(sync.chain().len() as i64);
        self.connected_peers.set(sync.peers().len() as i64);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics handle passed to handlers and peer tasks.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkchain_protocol::network::PeerSet;
    use linkchain_protocol::storage::ChainStore;

    #[test]
    fn record_counts_by_outcome() {
        let metrics = NodeMetrics::new();
        metrics.record(Reconciliation::Appended);
        metrics.record(Reconciliation::Appended);
        metrics.record(Reconciliation::Replaced);
        metrics.record(Reconciliation::Rejected);
        metrics.record(Reconciliation::Ignored);

        assert_eq!(metrics.blocks_appended_total.get(), 2);
        assert_eq!(metrics.chain_replacements_total.get(), 1);
        assert_eq!(metrics.rejected_messages_total.get(), 1);
        assert_eq!(metrics.full_chain_requests_total.get(), 0);
    }

    #[test]
    fn observe_reads_chain_and_peers() {
        let sync = Synchronizer::new(Arc::new(ChainStore::new()), Arc::new(PeerSet::new()));
        let (_peer, _rx) = sync.peers().register("127.0.0.1:6001");
        sync.on_local_block_mined("x").unwrap();

        let metrics = NodeMetrics::new();
        metrics.observe(&sync);
        assert_eq!(metrics.chain_height.get(), 2);
        assert_eq!(metrics.connected_peers.get(), 1);
    }

    #[test]
    fn encode_uses_namespace() {
        let metrics = NodeMetrics::new();
        metrics.chain_height.set(1);
        let text = metrics.encode().unwrap();
        assert!(text.contains("linkchain_chain_height 1"));
        assert!(text.contains("linkchain_rejected_messages_total"));
    }
}
