//! HTTP request handlers.
//!
//! `peer` carries the wire protocol every node exposes to other nodes;
//! `vote` carries the operator-facing endpoints. The liveness probe lives
//! here, sharing the acknowledgement body the POST handlers answer with.

pub mod peer;
pub mod vote;

use axum::Json;
use serde::Serialize;

/// The `{"status": "ok"}` body used by the POST acknowledgements and the
/// liveness probe.
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}

/// `GET /health` — liveness probe.
pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse::ok())
}
