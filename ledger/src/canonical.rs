//! Canonical wire serialisation.
//!
//! Every hash and every signature in the ledger is computed over a
//! *byte-exact* JSON rendering of the record: object fields are emitted in
//! a fixed order, items are separated by `", "` and keys from values by
//! `": "`. Peers that disagree on a single byte of this rendering will
//! reject each other's blocks, so all hashing and signing goes through
//! this module and nothing else.
//!
//! The rendering is deliberately *not* `serde_json::to_string` (which emits
//! compact JSON without the separating spaces): the spacing is part of the
//! on-the-wire contract and is pinned by the known-answer mining test in
//! [`crate::types::block`].
//!
//! All field values on the wire are ASCII (base64, hex digests, decimal
//! identifiers); a non-ASCII value would be emitted verbatim here while
//! other encoders may `\u`-escape it.

use crate::types::block::{Block, BlockData};
use crate::types::vote::VoteRecord;

/// Escapes a single string value as a JSON string literal.
fn string_literal(value: &str) -> String {
    // serde_json's escaping rules are the standard JSON ones; reuse them
    // for the leaf values instead of hand-rolling an escaper.
    serde_json::to_string(value).unwrap_or_else(|_| String::from("\"\""))
}

/// Renders the canonical signing image of a vote: the ordered
/// `{"addr_from": .., "addr_to": ..}` object.
///
/// This is the exact byte sequence hashed with SHA-256 and signed with the
/// voter's RSA key. Field order is significant.
pub fn vote_signing_image(addr_from: &str, addr_to: &str) -> String {
    format!(
        "{{\"addr_from\": {}, \"addr_to\": {}}}",
        string_literal(addr_from),
        string_literal(addr_to)
    )
}

/// Renders a signed vote record with its four fields in wire order.
fn vote_record_image(record: &VoteRecord) -> String {
    format!(
        "{{\"addr_from\": {}, \"addr_to\": {}, \"signature\": {}, \"pubkey\": {}}}",
        string_literal(&record.addr_from),
        string_literal(&record.addr_to),
        string_literal(&record.signature),
        string_literal(&record.pubkey)
    )
}

/// Renders one entry of a block's `data` list.
fn block_datum_image(datum: &BlockData) -> String {
    match datum {
        BlockData::Vote(record) => vote_record_image(record),
        BlockData::Raw(text) => string_literal(text),
    }
}

/// Renders the canonical hashed image of a block.
///
/// The image is the ordered object
/// `{"miner", "hash": "", "prevHash", "height", "nonce", "data"}` — the
/// `hash` field is always the empty string regardless of the block's
/// current hash, and `timestamp` is never part of the image (it is fixed
/// only after mining completes and travels solely in the distributed
/// record).
pub fn block_hash_image(block: &Block) -> String {
    let data: Vec<String> = block.data.iter().map(block_datum_image).collect();
    format!(
        "{{\"miner\": {}, \"hash\": \"\", \"prevHash\": {}, \"height\": {}, \"nonce\": {}, \"data\": [{}]}}",
        string_literal(&block.miner),
        string_literal(&block.prev_hash),
        block.height,
        block.nonce,
        data.join(", ")
    )
}
