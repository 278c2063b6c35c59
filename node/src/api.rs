//! # REST API
//!
//! Builds the axum router that exposes the node's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path         | Description                              |
//! |--------|--------------|------------------------------------------|
//! | GET    | `/health`    | Liveness probe                           |
//! | GET    | `/blocks`    | Full chain, genesis first                |
//! | POST   | `/mineBlock` | Mine a block with the given data         |
//! | GET    | `/peers`     | Remote addresses of connected peers      |
//! | POST   | `/addPeer`   | Connect to a new peer in the background  |
//! | GET    | `/metrics`   | Prometheus metrics                       |

use axum::{
    extract::{FromRef, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use linkchain_protocol::network::Synchronizer;

use crate::metrics::{metrics_handler, SharedMetrics};
use crate::p2p::P2p;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone; everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Chain and peer set, plus the reconciliation logic over them.
    pub sync: Synchronizer,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
    /// Transport used by `/addPeer`.
    pub p2p: P2p,
}

impl AppState {
    pub fn new(version: String, sync: Synchronizer, metrics: SharedMetrics) -> Self {
        let p2p = P2p::new(sync.clone(), metrics.clone());
        Self {
            version,
            sync,
            metrics,
            p2p,
        }
    }
}

impl FromRef<AppState> for SharedMetrics {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/blocks", get(blocks_handler))
        .route("/mineBlock", post(mine_block_handler))
        .route("/peers", get(peers_handler))
        .route("/addPeer", post(add_peer_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /mineBlock`.
#[derive(Debug, Deserialize)]
pub struct MineRequest {
    /// Block payload. Missing means empty.
    #[serde(default)]
    pub data: String,
}

/// Body of `POST /addPeer`.
#[derive(Debug, Deserialize)]
pub struct AddPeerRequest {
    /// `host:port` of the peer's P2P listener.
    pub peer: String,
}

/// Error payload for failed requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: 200 while the process is serving requests.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok", "version": state.version })),
    )
}

/// `GET /blocks`
async fn blocks_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.sync.chain().snapshot())
}

/// `POST /mineBlock`: appends a block on top of the local chain and
/// broadcasts it.
///
/// A failure here is never the caller's fault: it means the node produced a
/// block its own validator refused, and is reported as a 500.
async fn mine_block_handler(
    State(state): State<AppState>,
    Json(req): Json<MineRequest>,
) -> impl IntoResponse {
    match state.sync.on_local_block_mined(req.data) {
        Ok(block) => {
            state.metrics.blocks_mined_total.inc();
            state.metrics.observe(&state.sync);
            (StatusCode::OK, Json(block)).into_response()
        }
        Err(e) => {
            let err = ErrorResponse {
                error: format!("failed to mine block: {}", e),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(err)).into_response()
        }
    }
}

/// `GET /peers`
async fn peers_handler(State(state): State<AppState>) -> impl IntoResponse {
    let addresses: Vec<String> = state
        .sync
        .peers()
        .list()
        .into_iter()
        .map(|p| p.address)
        .collect();
    Json(addresses)
}

/// `POST /addPeer`: the connection is attempted in the background, so 202
/// says nothing about whether it will succeed.
async fn add_peer_handler(
    State(state): State<AppState>,
    Json(req): Json<AddPeerRequest>,
) -> impl IntoResponse {
    tracing::info!(peer = %req.peer, "adding peer");
    state.p2p.spawn_connect(req.peer);
    StatusCode::ACCEPTED
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    use linkchain_protocol::network::PeerSet;
    use linkchain_protocol::storage::{is_valid_chain, Block, ChainStore};

    use crate::metrics::NodeMetrics;

    fn test_app_state() -> AppState {
        let sync = Synchronizer::new(Arc::new(ChainStore::new()), Arc::new(PeerSet::new()));
        AppState::new("0.1.0-test".into(), sync, Arc::new(NodeMetrics::new()))
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Sends a POST request with JSON body and returns (status, body_bytes).
    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn blocks_starts_with_genesis() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/blocks").await;

        assert_eq!(status, StatusCode::OK);
        let blocks: Vec<Block> = serde_json::from_slice(&body).unwrap();
        assert_eq!(blocks, vec![Block::genesis()]);
    }

    #[tokio::test]
    async fn blocks_use_camel_case_fields() {
        let router = create_router(test_app_state());
        let (_, body) = get(&router, "/blocks").await;

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json[0]["index"], 0);
        assert_eq!(json[0]["previousHash"], "0");
        assert_eq!(json[0]["data"], "Genesis");
    }

    #[tokio::test]
    async fn mine_block_extends_chain() {
        let state = test_app_state();
        let router = create_router(state.clone());

        let (status, body) =
            post_json(&router, "/mineBlock", serde_json::json!({ "data": "hello" })).await;
        assert_eq!(status, StatusCode::OK);
        let block: Block = serde_json::from_slice(&body).unwrap();
        assert_eq!(block.index(), 1);
        assert_eq!(block.data(), "hello");
        assert_eq!(block.previous_hash(), Block::genesis().hash());

        let (_, body) = get(&router, "/blocks").await;
        let blocks: Vec<Block> = serde_json::from_slice(&body).unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(is_valid_chain(&blocks));

        assert_eq!(state.metrics.blocks_mined_total.get(), 1);
        assert_eq!(state.metrics.chain_height.get(), 2);
    }

    #[tokio::test]
    async fn mine_block_without_data_uses_empty_payload() {
        let router = create_router(test_app_state());
        let (status, body) = post_json(&router, "/mineBlock", serde_json::json!({})).await;

        assert_eq!(status, StatusCode::OK);
        let block: Block = serde_json::from_slice(&body).unwrap();
        assert_eq!(block.data(), "");
    }

    #[tokio::test]
    async fn mine_block_broadcasts_to_peers() {
        let state = test_app_state();
        let (_peer, mut rx) = state.sync.peers().register("10.0.0.9:6001");
        let router = create_router(state);

        let (status, body) =
            post_json(&router, "/mineBlock", serde_json::json!({ "data": "x" })).await;
        assert_eq!(status, StatusCode::OK);
        let block: Block = serde_json::from_slice(&body).unwrap();

        let sent = rx.try_recv().unwrap();
        assert_eq!(sent, linkchain_protocol::network::Message::latest(block));
    }

    #[tokio::test]
    async fn peers_lists_addresses() {
        let state = test_app_state();
        let (_a, _rx_a) = state.sync.peers().register("10.0.0.1:6001");
        let router = create_router(state);

        let (status, body) = get(&router, "/peers").await;
        assert_eq!(status, StatusCode::OK);
        let peers: Vec<String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(peers, vec!["10.0.0.1:6001".to_string()]);
    }

    #[tokio::test]
    async fn add_peer_connects_in_background() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = test_app_state();
        let router = create_router(state.clone());
        let (status, _) = post_json(
            &router,
            "/addPeer",
            serde_json::json!({ "peer": addr.to_string() }),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (_stream, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
            .await
            .unwrap()
            .unwrap();
        for _ in 0..200 {
            if state.sync.peers().len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        assert_eq!(state.sync.peers().list()[0].address, addr.to_string());
    }

    #[tokio::test]
    async fn add_peer_requires_peer_field() {
        let router = create_router(test_app_state());
        let (status, _) = post_json(&router, "/addPeer", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_prometheus_text() {
        let router = create_router(test_app_state());
        let _ = post_json(&router, "/mineBlock", serde_json::json!({ "data": "m" })).await;

        let (status, body) = get(&router, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("linkchain_blocks_mined_total 1"));
    }
}
