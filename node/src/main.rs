// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # linkchain Node
//!
//! Entry point for the `linkchain-node` binary. Parses CLI arguments,
//! initializes logging and metrics, then serves the peer listener and the
//! HTTP API side by side until a shutdown signal arrives.
//!
//! The binary supports two subcommands:
//!
//! - `run`     : start the node
//! - `version` : print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod p2p;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

use linkchain_protocol::network::{PeerSet, Synchronizer};
use linkchain_protocol::storage::ChainStore;

use cli::{Commands, LinkchainCli};
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = LinkchainCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the node: peer listener, outbound connections, and HTTP API.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "linkchain_node=info,linkchain_protocol=info,tower_http=info",
        args.log_format,
    );

    let initial_peers = args.initial_peers();
    tracing::info!(
        http_port = args.http_port,
        p2p_port = args.p2p_port,
        peers = initial_peers.len(),
        "starting linkchain-node"
    );

    // --- Chain state ---
    let chain = Arc::new(ChainStore::new());
    let peers = Arc::new(PeerSet::new());
    let sync = Synchronizer::new(chain, peers);

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());
    node_metrics.observe(&sync);

    // --- Application state ---
    let version = format!(
        "{} (protocol {})",
        env!("CARGO_PKG_VERSION"),
        linkchain_protocol::config::PROTOCOL_VERSION,
    );
    let app_state = api::AppState::new(version, sync, Arc::clone(&node_metrics));
    let p2p = app_state.p2p.clone();

    // --- P2P listener ---
    let p2p_addr = SocketAddr::new(args.bind, args.p2p_port);
    let p2p_listener = tokio::net::TcpListener::bind(p2p_addr)
        .await
        .with_context(|| format!("failed to bind P2P listener on {}", p2p_addr))?;
    tracing::info!("P2P listening on {}", p2p_addr);

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = SocketAddr::new(args.bind, args.http_port);
    let api_listener = tokio::net::TcpListener::bind(api_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", api_addr))?;
    tracing::info!("HTTP API listening on {}", api_addr);

    // --- Initial peers ---
    p2p.connect_all(&initial_peers);

    // --- Serve ---
    tokio::select! {
        res = p2p.serve(p2p_listener) => {
            if let Err(e) = res {
                tracing::error!("P2P listener error: {}", e);
            }
        }
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    tracing::info!("linkchain-node stopped");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("linkchain-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol       {}", linkchain_protocol::config::PROTOCOL_VERSION);
    println!("rustc          {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
