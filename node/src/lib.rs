//! Node library crate.
//!
//! Composes the `ledger` engine into a runnable network participant:
//!
//! - persistent identity (`identity`),
//! - the peer node itself — roster, bootstrap, gossip, scheduled miner
//!   (`node`),
//! - the axum request handlers (`routes`),
//! - process configuration (`config`).
//!
//! The binary in `main.rs` wires these together and serves the peer
//! protocol over HTTP.

pub mod config;
pub mod identity;
pub mod node;
pub mod routes;

pub use config::NodeConfig;
pub use identity::{Identity, IdentityError};
pub use node::{Node, NodeStatus, SharedState};
