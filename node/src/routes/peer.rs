//! Handlers for the peer wire protocol.
//!
//! Every node exposes the same endpoints. Failures on the receive paths
//! stay silent: an invalid vote or block is dropped and the sender still
//! gets its acknowledgement, per the ledger's propagation policy.

use axum::{extract::State, Json};

use ledger::{Block, PeerInfo, VoteRecord};

use super::StatusResponse;
use crate::node::SharedState;

/// `GET /list` — the current participant roster.
pub async fn list(State(node): State<SharedState>) -> Json<Vec<PeerInfo>> {
    Json(node.roster_snapshot())
}

/// `POST /advertise` — a peer announces itself.
pub async fn advertise(
    State(node): State<SharedState>,
    Json(peer): Json<PeerInfo>,
) -> Json<StatusResponse> {
    node.add_participant(peer);
    Json(StatusResponse::ok())
}

/// `GET /blockchain` — the committed chain.
pub async fn blockchain(State(node): State<SharedState>) -> Json<Vec<Block>> {
    Json(node.chain().snapshot())
}

/// `GET /pool` — the pending transaction pool.
pub async fn pool(State(node): State<SharedState>) -> Json<Vec<VoteRecord>> {
    Json(node.chain().pool_snapshot())
}

/// `POST /update_pool` — one gossiped signed vote.
pub async fn update_pool(
    State(node): State<SharedState>,
    Json(record): Json<VoteRecord>,
) -> Json<StatusResponse> {
    node.accept_vote_record(record).await;
    Json(StatusResponse::ok())
}

/// `POST /add_new_block` — one gossiped block.
pub async fn add_new_block(
    State(node): State<SharedState>,
    Json(block): Json<Block>,
) -> Json<StatusResponse> {
    node.accept_block(block);
    Json(StatusResponse::ok())
}
