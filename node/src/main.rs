// node/src/main.rs

//! Voting-node binary.
//!
//! Loads (or creates) the persistent identity, bootstraps against the
//! network — roster fetch, advertisement, chain sync or genesis — and
//! then serves the peer wire protocol plus the operator endpoints:
//!
//! - `GET /health`, `GET /status`
//! - `GET /list`, `POST /advertise`
//! - `GET /blockchain`, `GET /pool`
//! - `POST /update_pool`, `POST /add_new_block`
//! - `POST /cast_vote`

use axum::{
    routing::{get, post},
    Router,
};
use tokio::signal;

use node::config::NodeConfig;
use node::routes::{self, peer, vote};
use node::{identity, Node};

#[tokio::main]
async fn main() {
    // Basic tracing setup.
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "node=info,ledger=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cfg = NodeConfig::from_env();

    let identity = identity::load_or_create(&cfg.data_dir, cfg.ledger.key_bits)
        .map_err(|e| format!("failed to load identity from {}: {e}", cfg.data_dir.display()))?;

    tracing::info!(
        miner_id = %identity.miner_id,
        address = %cfg.addr,
        master = %cfg.ledger.master_addr,
        "starting voting node"
    );

    let addr = cfg.addr.clone();
    let node = Node::new(cfg, identity).map_err(|e| format!("failed to build node: {e}"))?;

    // Bootstrap completes before any request is served; the first node in
    // the network mines its genesis block here.
    node.clone()
        .bootstrap()
        .await
        .map_err(|e| format!("bootstrap failed: {e}"))?;

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/status", get(vote::status))
        .route("/list", get(peer::list))
        .route("/advertise", post(peer::advertise))
        .route("/blockchain", get(peer::blockchain))
        .route("/pool", get(peer::pool))
        .route("/update_pool", post(peer::update_pool))
        .route("/add_new_block", post(peer::add_new_block))
        .route("/cast_vote", post(vote::cast_vote))
        .with_state(node);

    tracing::info!("node listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("failed to bind {addr}: {e}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("server error: {e}"))?;

    Ok(())
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
