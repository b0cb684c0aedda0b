//! Operator-facing endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use ledger::{VoteError, VoteRecord};

use crate::node::{NodeStatus, SharedState};

/// Request body for `POST /cast_vote`.
#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    /// Candidate address the operator votes for.
    pub addr_to: String,
}

/// Response body for a successful `POST /cast_vote`.
#[derive(Debug, Serialize)]
pub struct CastVoteResponse {
    pub status: &'static str,
    pub vote: VoteRecord,
}

/// `POST /cast_vote`
///
/// Signs and gossips this node's single vote. Unlike the silent peer
/// paths, rejections here reach the operator: a repeated vote answers
/// 409, an unknown candidate 400.
pub async fn cast_vote(
    State(node): State<SharedState>,
    Json(body): Json<CastVoteRequest>,
) -> Result<(StatusCode, Json<CastVoteResponse>), (StatusCode, String)> {
    match node.cast_vote(&body.addr_to).await {
        Ok(vote) => Ok((
            StatusCode::OK,
            Json(CastVoteResponse { status: "ok", vote }),
        )),
        Err(err @ VoteError::DoubleVote) => Err((StatusCode::CONFLICT, err.to_string())),
        Err(err @ VoteError::UnknownCandidate) => Err((StatusCode::BAD_REQUEST, err.to_string())),
        Err(err) => Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string())),
    }
}

/// `GET /status` — operator summary of this node.
pub async fn status(State(node): State<SharedState>) -> Json<NodeStatus> {
    Json(node.status())
}
