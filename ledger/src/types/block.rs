//! Blocks and proof-of-work mining.
//!
//! A block batches signed votes behind a SHA-256 proof-of-work. The hash
//! covers the canonical image rendered by
//! [`crate::canonical::block_hash_image`] — the block with its `hash`
//! field blanked and no `timestamp` — so the digest, and therefore the
//! work, is fixed entirely by `{miner, prevHash, height, nonce, data}`.
//! The timestamp is recorded only once mining completes and travels in the
//! distributed record without being hashed.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical;
use crate::types::vote::VoteRecord;

/// Required hex prefix of every block hash (12 leading zero bits).
pub const POW_PREFIX: &str = "000";

/// `prevHash` marker of the height-0 block.
pub const GENESIS_PREV_HASH: &str = "Genesis Block";

/// Synthetic voter of the genesis transaction.
pub const GENESIS_ADDR: &str = "Genesis Addr";

/// One entry of a block's `data` list.
///
/// Real blocks carry signed vote records; bare strings also appear (the
/// genesis-era probe data and known-answer fixtures), so the wire type
/// admits both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockData {
    /// A signed vote.
    Vote(VoteRecord),
    /// An opaque string payload.
    Raw(String),
}

/// A block of the voting ledger.
///
/// Wire field order matches the hashed image: `miner`, `hash`, `prevHash`,
/// `height`, `nonce`, `data`, with `timestamp` appended after mining.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Identifier of the node that mined this block.
    pub miner: String,
    /// Lowercase hex SHA-256 of the canonical image; empty until mined.
    pub hash: String,
    /// Hash of the preceding block, or [`GENESIS_PREV_HASH`] at height 0.
    #[serde(rename = "prevHash")]
    pub prev_hash: String,
    /// Position in the chain; strictly `prev.height + 1`.
    pub height: u64,
    /// Counter mutated by the mining loop.
    pub nonce: u64,
    /// Ordered transaction batch.
    pub data: Vec<BlockData>,
    /// Decimal-string wall-clock seconds of mining completion.
    ///
    /// Absent until [`Block::mine`] returns, then fixed. Not part of the
    /// hashed image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Block {
    /// Assembles an unmined block: empty hash, nonce 0, no timestamp.
    pub fn new(prev_hash: String, height: u64, data: Vec<BlockData>, miner: String) -> Self {
        Self {
            miner,
            hash: String::new(),
            prev_hash,
            height,
            nonce: 0,
            data,
            timestamp: None,
        }
    }

    /// Hex SHA-256 of the block's current canonical image.
    pub fn image_digest(&self) -> String {
        let image = canonical::block_hash_image(self);
        hex::encode(Sha256::digest(image.as_bytes()))
    }

    /// Performs the proof-of-work.
    ///
    /// Increments `nonce` until the image digest starts with
    /// [`POW_PREFIX`], then stores the digest and stamps the completion
    /// time. Runs to completion; callers must not hold chain or pool locks
    /// while this loop spins.
    pub fn mine(&mut self) {
        loop {
            let digest = self.image_digest();
            if digest.starts_with(POW_PREFIX) {
                self.hash = digest;
                self.timestamp = Some(unix_timestamp_string());
                return;
            }
            self.nonce += 1;
        }
    }

    /// The mining-completion time as numeric seconds, if present and
    /// well-formed. Used by the head tie-break.
    pub fn timestamp_seconds(&self) -> Option<f64> {
        self.timestamp.as_deref().and_then(|t| t.parse::<f64>().ok())
    }
}

/// Current wall-clock time as a decimal string of epoch seconds.
fn unix_timestamp_string() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
