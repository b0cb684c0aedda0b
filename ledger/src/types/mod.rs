//! Core wire types of the voting ledger.
//!
//! The types here mirror the peer wire protocol field-for-field: what
//! serde emits for a [`Block`] or a [`VoteRecord`] is exactly what peers
//! exchange, and the canonical hashed/signed images are rendered from the
//! same structs by [`crate::canonical`].

pub mod block;
pub mod vote;

pub use block::{Block, BlockData, GENESIS_ADDR, GENESIS_PREV_HASH, POW_PREFIX};
pub use vote::{Vote, VoteRecord};
