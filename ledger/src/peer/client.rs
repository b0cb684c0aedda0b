//! Outbound peer requests.
//!
//! A thin typed client for the JSON-over-HTTP peer protocol. All peers
//! expose the same endpoints; addresses are bare `host:port` strings, so
//! the client prefixes `http://` itself.
//!
//! Error mapping follows the ledger's failure taxonomy: a 408 answer is a
//! [`PeerError::Timeout`] (the caller drops that peer from its roster),
//! any other non-200 is [`PeerError::Status`], and transport failures are
//! [`PeerError::Network`]. Callers never retry; gossip redelivery is the
//! only repair mechanism.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use super::PeerInfo;
use crate::error::PeerError;
use crate::types::block::Block;
use crate::types::vote::VoteRecord;

/// HTTP client for the peer wire protocol.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct PeerClient {
    client: Client,
}

impl PeerClient {
    /// Builds a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PeerError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn url(address: &str, path: &str) -> String {
        format!(
            "http://{}/{}",
            address.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn check(response: Response) -> Result<Response, PeerError> {
        match response.status() {
            StatusCode::OK => Ok(response),
            StatusCode::REQUEST_TIMEOUT => Err(PeerError::Timeout),
            status => Err(PeerError::Status(status.as_u16())),
        }
    }

    /// `GET /list` — the peer's current participant roster.
    pub async fn fetch_roster(&self, address: &str) -> Result<Vec<PeerInfo>, PeerError> {
        let url = Self::url(address, "list");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PeerError::Network(format!("GET {url} failed: {e}")))?;
        Self::check(response)
            .await?
            .json::<Vec<PeerInfo>>()
            .await
            .map_err(|e| PeerError::Protocol(format!("bad roster body: {e}")))
    }

    /// `GET /blockchain` — the peer's full chain snapshot.
    pub async fn fetch_chain(&self, address: &str) -> Result<Vec<Block>, PeerError> {
        let url = Self::url(address, "blockchain");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PeerError::Network(format!("GET {url} failed: {e}")))?;
        Self::check(response)
            .await?
            .json::<Vec<Block>>()
            .await
            .map_err(|e| PeerError::Protocol(format!("bad chain body: {e}")))
    }

    /// `POST /advertise` — announce ourselves to a peer.
    pub async fn advertise(&self, address: &str, me: &PeerInfo) -> Result<(), PeerError> {
        let url = Self::url(address, "advertise");
        let response = self
            .client
            .post(&url)
            .json(me)
            .send()
            .await
            .map_err(|e| PeerError::Network(format!("POST {url} failed: {e}")))?;
        Self::check(response).await.map(|_| ())
    }

    /// `POST /update_pool` — gossip one signed vote.
    pub async fn send_vote(&self, address: &str, record: &VoteRecord) -> Result<(), PeerError> {
        let url = Self::url(address, "update_pool");
        let response = self
            .client
            .post(&url)
            .json(record)
            .send()
            .await
            .map_err(|e| PeerError::Network(format!("POST {url} failed: {e}")))?;
        Self::check(response).await.map(|_| ())
    }

    /// `POST /add_new_block` — gossip one mined block.
    pub async fn send_block(&self, address: &str, block: &Block) -> Result<(), PeerError> {
        let url = Self::url(address, "add_new_block");
        let response = self
            .client
            .post(&url)
            .json(block)
            .send()
            .await
            .map_err(|e| PeerError::Network(format!("POST {url} failed: {e}")))?;
        Self::check(response).await.map(|_| ())
    }
}
