//! Peer roster types and the gossip HTTP client.
//!
//! Peers know each other as `{miner_id, address}` records exchanged via
//! `/list` and `/advertise`; [`client::PeerClient`] is the outbound half
//! of the wire protocol.

pub mod client;

use serde::{Deserialize, Serialize};

pub use client::PeerClient;

/// One entry of the participant roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    /// Stable identifier of the peer node.
    pub miner_id: String,
    /// `host:port` of the peer's transport.
    pub address: String,
}
