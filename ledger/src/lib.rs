//! Ledger library crate.
//!
//! This crate provides the engine of the peer-to-peer voting ledger:
//!
//! - signed vote transactions and their wire records (`types`),
//! - proof-of-work blocks and the canonical hashed image (`types`,
//!   `canonical`),
//! - the replicated chain with head reconciliation and the pending-vote
//!   pool (`chain`),
//! - RSA identity keys (`keys`),
//! - the peer roster and the outbound gossip client (`peer`),
//! - shared configuration (`config`) and the error taxonomy (`error`).
//!
//! The node binary composes these pieces with an HTTP transport to form a
//! full network participant.

pub mod canonical;
pub mod chain;
pub mod config;
pub mod error;
pub mod keys;
pub mod peer;
pub mod types;

// Re-export the engine surface at the crate root for convenience.
pub use chain::Chain;
pub use config::{Candidate, LedgerConfig};
pub use error::{KeyError, PeerError, VoteError};
pub use keys::IdentityKey;
pub use peer::{PeerClient, PeerInfo};
pub use types::{Block, BlockData, Vote, VoteRecord, GENESIS_ADDR, GENESIS_PREV_HASH, POW_PREFIX};
