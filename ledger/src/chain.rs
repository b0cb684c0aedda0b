//! The replicated chain and its transaction pool.
//!
//! [`Chain`] owns the ordered block sequence (`storage`) and the set of
//! pending signed votes (`pool`), each behind its own mutex. All mutation
//! funnels through a handful of entry points: [`Chain::install`] for the
//! trust-on-bootstrap snapshot, [`Chain::create_genesis`] for the first
//! node in a network, and [`Chain::accept`] for everything after that.
//!
//! `accept` is the head-reconciliation protocol: an incoming block either
//! extends the chain by one, replaces the current head after losing a
//! deterministic tie-break (earlier timestamp first, then smaller miner
//! id), or is dropped. Validation failures are silent — the block is
//! discarded, the pool untouched, and nothing is surfaced to the sender;
//! peers re-broadcast on their own schedule.
//!
//! Locking: the chain mutex serialises head reconciliation, the pool
//! mutex serialises pool mutation, and when both are needed the chain
//! lock is taken first. Neither lock is ever held while a nonce is being
//! mined or while a peer request is in flight.

use parking_lot::Mutex;

use crate::error::KeyError;
use crate::keys::IdentityKey;
use crate::types::block::{Block, BlockData, GENESIS_ADDR, GENESIS_PREV_HASH, POW_PREFIX};
use crate::types::vote::{Vote, VoteRecord};

/// The ledger state of one node: committed blocks plus pending votes.
#[derive(Default)]
pub struct Chain {
    storage: Mutex<Vec<Block>>,
    pool: Mutex<Vec<VoteRecord>>,
}

impl Chain {
    /// Creates an empty chain with an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff no block has been committed yet.
    pub fn empty(&self) -> bool {
        self.storage.lock().is_empty()
    }

    /// Replaces the whole block sequence with a peer's snapshot.
    ///
    /// No validation happens here (trust-on-bootstrap); the caller is a
    /// fresh node adopting the network's current chain.
    pub fn install(&self, blocks: Vec<Block>) {
        tracing::info!(blocks = blocks.len(), "installing chain snapshot");
        *self.storage.lock() = blocks;
    }

    /// Mines the height-0 block for a brand-new network.
    ///
    /// The genesis data is a single signed vote from [`GENESIS_ADDR`] to
    /// [`GENESIS_PREV_HASH`], signed with this node's own key.
    pub fn create_genesis(&self, key: &IdentityKey, miner_id: &str) -> Result<(), KeyError> {
        let mut vote = Vote::new(GENESIS_ADDR, GENESIS_PREV_HASH);
        let record = vote.signed_form(key)?;
        let mut block = Block::new(
            GENESIS_PREV_HASH.to_string(),
            0,
            vec![BlockData::Vote(record)],
            miner_id.to_string(),
        );
        block.mine();
        tracing::info!(hash = %block.hash, nonce = block.nonce, "mined genesis block");
        *self.storage.lock() = vec![block];
        Ok(())
    }

    /// True iff `miner_id` already appears as a vote source in any
    /// committed block or in the pending pool.
    pub fn has_voted(&self, miner_id: &str) -> bool {
        let committed = self.storage.lock().iter().any(|block| {
            block.data.iter().any(|datum| match datum {
                BlockData::Vote(record) => record.addr_from == miner_id,
                BlockData::Raw(_) => false,
            })
        });
        if committed {
            return true;
        }
        self.pool
            .lock()
            .iter()
            .any(|record| record.addr_from == miner_id)
    }

    /// Appends a record to the pool unless an identical one is already
    /// pending. Returns whether the record was added.
    pub fn pool_add(&self, record: VoteRecord) -> bool {
        let mut pool = self.pool.lock();
        if pool.contains(&record) {
            tracing::debug!(addr_from = %record.addr_from, "vote already pending");
            return false;
        }
        pool.push(record);
        true
    }

    /// Drops from the pool every vote that appears in `block.data`.
    pub fn pool_remove_all(&self, block: &Block) {
        let mut pool = self.pool.lock();
        pool.retain(|record| {
            !block
                .data
                .iter()
                .any(|datum| matches!(datum, BlockData::Vote(r) if r == record))
        });
    }

    /// Current pending votes, in insertion order.
    pub fn pool_snapshot(&self) -> Vec<VoteRecord> {
        self.pool.lock().clone()
    }

    /// Signature check for a single received vote record.
    pub fn validate_vote(&self, record: &VoteRecord) -> bool {
        match record.verify() {
            Ok(()) => true,
            Err(err) => {
                tracing::info!(addr_from = %record.addr_from, %err, "dropping vote");
                false
            }
        }
    }

    /// Full block validation against its predecessor.
    ///
    /// True iff the previous hash links, the proof-of-work prefix holds,
    /// re-hashing the reconstructed canonical image reproduces the
    /// advertised hash exactly (no re-mining), and every contained vote
    /// verifies. A bare-string datum cannot carry a signature and fails.
    pub fn validate(&self, block: &Block, prev: &Block) -> bool {
        if block.prev_hash != prev.hash {
            tracing::debug!("block rejected: previous hash does not link");
            return false;
        }
        if !block.hash.starts_with(POW_PREFIX) {
            tracing::debug!("block rejected: missing proof-of-work prefix");
            return false;
        }
        if !Self::hash_matches(block) {
            tracing::debug!("block rejected: hash does not match canonical image");
            return false;
        }
        Self::data_verifies(block)
    }

    /// Structural validation of a height-0 block arriving on an empty
    /// chain: genesis prev marker, proof-of-work, exact hash, signatures.
    fn validate_genesis(&self, block: &Block) -> bool {
        block.prev_hash == GENESIS_PREV_HASH
            && block.height == 0
            && block.hash.starts_with(POW_PREFIX)
            && Self::hash_matches(block)
            && Self::data_verifies(block)
    }

    /// Rebuilds the block's pre-mining image and compares digests.
    ///
    /// The rebuild copies `{prevHash, height, data, miner}` into a fresh
    /// block, restores the received nonce, and hashes with the `hash`
    /// field blanked — the inverse of mining, never a re-mine.
    fn hash_matches(block: &Block) -> bool {
        let mut rebuilt = Block::new(
            block.prev_hash.clone(),
            block.height,
            block.data.clone(),
            block.miner.clone(),
        );
        rebuilt.nonce = block.nonce;
        rebuilt.image_digest() == block.hash
    }

    fn data_verifies(block: &Block) -> bool {
        block.data.iter().all(|datum| match datum {
            BlockData::Vote(record) => record.verify().is_ok(),
            BlockData::Raw(_) => false,
        })
    }

    /// Builds and mines the next block from the current pool, then feeds
    /// it through [`Chain::accept`]. Returns the mined block for
    /// broadcasting, or `None` on an empty chain.
    ///
    /// Both locks are released before the nonce starts spinning; by the
    /// time the mined block re-enters `accept`, a competing block may
    /// already hold the head, and the tie-break decides as usual.
    pub fn mine_next(&self, miner_id: &str) -> Option<Block> {
        let (prev_hash, height) = {
            let storage = self.storage.lock();
            let prev = storage.last()?;
            (prev.hash.clone(), prev.height + 1)
        };
        let data: Vec<BlockData> = self
            .pool
            .lock()
            .iter()
            .cloned()
            .map(BlockData::Vote)
            .collect();

        let mut block = Block::new(prev_hash, height, data, miner_id.to_string());
        block.mine();
        tracing::info!(height = block.height, hash = %block.hash, nonce = block.nonce, "mined block");

        self.accept(block.clone());
        Some(block)
    }

    /// Head reconciliation: extend, replace the head, or drop.
    ///
    /// Height equal to the head enters the tie-break (the earlier
    /// timestamp wins; on a tie, the lexicographically smaller miner id).
    /// When the head loses, its votes that the winner does not carry go
    /// back to the pool. Height `head + 1` extends after validation.
    /// Anything else — a gap or a stale height — is silently dropped.
    pub fn accept(&self, block: Block) {
        let mut storage = self.storage.lock();

        let Some(head) = storage.last().cloned() else {
            // Empty chain: admit exactly a structurally valid genesis.
            if self.validate_genesis(&block) {
                tracing::info!(hash = %block.hash, "accepted genesis block");
                storage.push(block);
            } else {
                tracing::debug!("block on empty chain rejected");
            }
            return;
        };

        if head.height == block.height {
            let Some(prev_index) = storage.len().checked_sub(2) else {
                // A height-0 tie has no predecessor to validate against.
                tracing::debug!("dropping competing genesis block");
                return;
            };
            let prev = storage[prev_index].clone();

            let incoming_wins = match (head.timestamp_seconds(), block.timestamp_seconds()) {
                (Some(head_ts), Some(block_ts)) => {
                    if head_ts > block_ts {
                        true
                    } else if head_ts == block_ts {
                        head.miner > block.miner
                    } else {
                        false
                    }
                }
                _ => false,
            };

            if incoming_wins && self.validate(&block, &prev) {
                tracing::info!(
                    height = block.height,
                    winner = %block.miner,
                    loser = %head.miner,
                    "replacing chain head after tie-break"
                );
                if let Some(slot) = storage.last_mut() {
                    *slot = block.clone();
                }
                // Votes only the ejected head carried go back to pending.
                for datum in &head.data {
                    if let BlockData::Vote(record) = datum {
                        if !block.data.contains(datum) {
                            self.pool_add(record.clone());
                        }
                    }
                }
            }
        } else if head.height + 1 == block.height {
            if self.validate(&block, &head) {
                tracing::info!(height = block.height, hash = %block.hash, "appending block");
                storage.push(block.clone());
                self.pool_remove_all(&block);
            }
        } else {
            tracing::debug!(
                head_height = head.height,
                block_height = block.height,
                "dropping block with stale or gapped height"
            );
        }
    }

    /// The committed block sequence, for peer serving.
    pub fn snapshot(&self) -> Vec<Block> {
        self.storage.lock().clone()
    }

    /// The current head block, if any.
    pub fn head(&self) -> Option<Block> {
        self.storage.lock().last().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> IdentityKey {
        IdentityKey::generate(1024).expect("keygen")
    }

    fn signed_vote(key: &IdentityKey, from: &str, to: &str) -> VoteRecord {
        Vote::new(from, to).signed_form(key).expect("signed form")
    }

    fn genesis_chain(key: &IdentityKey, miner_id: &str) -> Chain {
        let chain = Chain::new();
        chain.create_genesis(key, miner_id).expect("genesis");
        chain
    }

    /// Builds and mines a block extending `prev` with the given votes.
    fn mined_block(prev: &Block, votes: Vec<VoteRecord>, miner: &str) -> Block {
        let mut block = Block::new(
            prev.hash.clone(),
            prev.height + 1,
            votes.into_iter().map(BlockData::Vote).collect(),
            miner.to_string(),
        );
        block.mine();
        block
    }

    // Two-block chain mined by node "5106", which voted for "12345".
    const FIXTURE: &str = r#"[{"miner": "5106", "hash": "000fc4a7168fd501a2576da8841d62f781061cb14abb8aac7300a8641477773b", "prevHash": "Genesis Block", "height": 0, "nonce": 2923, "data": [{"addr_from": "Genesis Addr", "addr_to": "Genesis Block", "signature": "G+jAyLxJ1xQIPP3vzrX80sYzZ+JX78OSOxc9kGWqxQ9nRTrfNhnXPA4xu6fZeuidjD1chPuYTJyu77J0M5lRFAF4NbT1QemKAon9wBGtjklX4FpEZAmDK/ex58Etj2TY3fgFqByKzKO/eMOnjBqBfO0HQkxO+cob58S8gLWEt3I=", "pubkey": "LS0tLS1CRUdJTiBQVUJMSUMgS0VZLS0tLS0KTUlHZk1BMEdDU3FHU0liM0RRRUJBUVVBQTRHTkFEQ0JpUUtCZ1FEbUk0U1BjSTI0eVpqY0o0eHZjcHY1aHBXMgpQYVdkYWpYUm84VGU3VktBcnB5Skh2N0VMSUQ1dEZXKzNwRk8rcVBYYk1TKzk4bnl6Zk1ockY3Rk5zcVlwdlBRCmxCekxYZXZJWDQvdXlPa0p0UHFBM1VTdExXL3ZjRTR2NnNTcVNQMndRaVhsazV5TkVGaGVaNGxNYXVrNzUyemIKekhic2xpc1A5SlJYNCtiQS93SURBUUFCCi0tLS0tRU5EIFBVQkxJQyBLRVktLS0tLT09"}], "timestamp": "1531853048.28545"}, {"miner": "5106", "hash": "00057d09370bcd45fa37ef5e5085e7923658d03633b2d444497dd72a18a33baa", "prevHash": "000fc4a7168fd501a2576da8841d62f781061cb14abb8aac7300a8641477773b", "height": 1, "nonce": 1046, "data": [{"addr_from": "5106", "addr_to": "12345", "signature": "cQ7WZNVP9J8LD1WMB1H6KGBCHkXw+NVgISFbWcWsvgsBFgl5FqIA0SrT0fLYjoxGzw+kIMBlF1dOZ/G49jIJfqclqbQQiwMnsor3XgJb4Inqt6Q6CR/zxMWeFN1m1VAvnX8PgZxOuja+WSV2Lp8cLzsIsZBHWpCtOSeChJ2zV0w=", "pubkey": "LS0tLS1CRUdJTiBQVUJMSUMgS0VZLS0tLS0KTUlHZk1BMEdDU3FHU0liM0RRRUJBUVVBQTRHTkFEQ0JpUUtCZ1FEbUk0U1BjSTI0eVpqY0o0eHZjcHY1aHBXMgpQYVdkYWpYUm84VGU3VktBcnB5Skh2N0VMSUQ1dEZXKzNwRk8rcVBYYk1TKzk4bnl6Zk1ockY3Rk5zcVlwdlBRCmxCekxYZXZJWDQvdXlPa0p0UHFBM1VTdExXL3ZjRTR2NnNTcVNQMndRaVhsazV5TkVGaGVaNGxNYXVrNzUyemIKekhic2xpc1A5SlJYNCtiQS93SURBUUFCCi0tLS0tRU5EIFBVQkxJQyBLRVktLS0tLT09"}], "timestamp": "1531853066.532551"}]"#;

    #[test]
    fn fresh_chain_is_empty() {
        let chain = Chain::new();
        assert!(chain.empty());
        assert!(chain.snapshot().is_empty());
    }

    #[test]
    fn genesis_block_is_mined_and_linked() {
        let key = test_key();
        let chain = genesis_chain(&key, "1234");

        let snapshot = chain.snapshot();
        assert_eq!(snapshot.len(), 1);

        let genesis = &snapshot[0];
        assert_eq!(genesis.height, 0);
        assert_eq!(genesis.prev_hash, GENESIS_PREV_HASH);
        assert!(genesis.hash.starts_with(POW_PREFIX));
        assert!(genesis.timestamp.is_some());

        match &genesis.data[0] {
            BlockData::Vote(record) => {
                assert_eq!(record.addr_from, GENESIS_ADDR);
                assert!(record.verify().is_ok());
            }
            BlockData::Raw(_) => panic!("genesis data should be a signed vote"),
        }
    }

    #[test]
    fn validate_accepts_well_formed_successor() {
        let key = test_key();
        let chain = genesis_chain(&key, "1234");
        let genesis = chain.head().expect("genesis");

        let block = mined_block(&genesis, vec![signed_vote(&key, "1234", "4567")], "1234");
        assert!(chain.validate(&block, &genesis));
    }

    #[test]
    fn validate_rejects_tampered_blocks() {
        let key = test_key();
        let chain = genesis_chain(&key, "1234");
        let genesis = chain.head().expect("genesis");

        let good = mined_block(&genesis, vec![signed_vote(&key, "1234", "4567")], "1234");

        // Broken previous-hash link.
        let mut bad = good.clone();
        bad.prev_hash = "00012345".to_string();
        assert!(!chain.validate(&bad, &genesis));

        // Wrong height changes the hashed image.
        let mut bad = good.clone();
        bad.height = 5;
        assert!(!chain.validate(&bad, &genesis));

        // Missing proof-of-work prefix.
        let mut bad = good.clone();
        bad.hash = "0111111111".to_string();
        assert!(!chain.validate(&bad, &genesis));

        // Prefix holds but the digest does not match the image.
        let mut bad = good.clone();
        bad.hash = "0001111111".to_string();
        assert!(!chain.validate(&bad, &genesis));

        // Tampered transaction signature.
        let mut record = signed_vote(&key, "1234", "4567");
        record.signature = signed_vote(&key, "1234", "9999").signature;
        let bad = mined_block(&genesis, vec![record], "1234");
        assert!(!chain.validate(&bad, &genesis));
    }

    #[test]
    fn has_voted_scans_committed_blocks() {
        let chain = Chain::new();
        let blocks: Vec<Block> = serde_json::from_str(FIXTURE).expect("fixture parses");
        chain.install(blocks);

        assert!(chain.has_voted("5106"));
        assert!(!chain.has_voted("1234"));
    }

    #[test]
    fn has_voted_counts_pending_votes() {
        let key = test_key();
        let chain = genesis_chain(&key, "1234");

        assert!(!chain.has_voted("777"));
        chain.pool_add(signed_vote(&key, "777", "12345"));
        assert!(chain.has_voted("777"));
    }

    #[test]
    fn pool_deduplicates_identical_records() {
        let key = test_key();
        let chain = Chain::new();
        let record = signed_vote(&key, "1234", "4567");

        assert!(chain.pool_add(record.clone()));
        assert!(!chain.pool_add(record));
        assert_eq!(chain.pool_snapshot().len(), 1);
    }

    #[test]
    fn mine_next_commits_pool_votes() {
        let key = test_key();
        let chain = genesis_chain(&key, "1234");
        let record = signed_vote(&key, "1234", "4567");
        chain.pool_add(record.clone());

        let block = chain.mine_next("1234").expect("mined");
        assert_eq!(block.height, 1);
        assert!(block.data.contains(&BlockData::Vote(record)));

        // Committed, removed from the pool.
        assert_eq!(chain.snapshot().len(), 2);
        assert!(chain.pool_snapshot().is_empty());
    }

    #[test]
    fn mine_next_on_empty_chain_is_none() {
        let chain = Chain::new();
        assert!(chain.mine_next("1234").is_none());
    }

    #[test]
    fn accept_drops_gapped_heights() {
        let key = test_key();
        let chain = genesis_chain(&key, "1234");
        let genesis = chain.head().expect("genesis");

        let mut gapped = mined_block(&genesis, Vec::new(), "1234");
        gapped.height = genesis.height + 2;

        chain.accept(gapped);
        assert_eq!(chain.snapshot().len(), 1);
    }

    #[test]
    fn accept_is_idempotent_for_the_current_head() {
        let key = test_key();
        let chain = genesis_chain(&key, "1234");
        chain.pool_add(signed_vote(&key, "1234", "4567"));
        let head = chain.mine_next("1234").expect("mined");

        chain.accept(head.clone());
        let snapshot = chain.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1], head);
        assert!(chain.pool_snapshot().is_empty());
    }

    #[test]
    fn earlier_timestamp_wins_the_tie_break() {
        let key_a = test_key();
        let key_b = test_key();
        let chain = genesis_chain(&key_a, "2000");
        let genesis = chain.head().expect("genesis");

        let vote_a = signed_vote(&key_a, "2000", "12345");
        let vote_b = signed_vote(&key_b, "1000", "5678");

        let mut head = mined_block(&genesis, vec![vote_a.clone()], "2000");
        head.timestamp = Some("200.0".to_string());
        chain.accept(head);
        assert_eq!(chain.snapshot().len(), 2);

        let mut rival = mined_block(&genesis, vec![vote_b.clone()], "1000");
        rival.timestamp = Some("100.0".to_string());
        chain.accept(rival.clone());

        let snapshot = chain.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1], rival);
        // The ejected head's vote is pending again.
        assert_eq!(chain.pool_snapshot(), vec![vote_a]);
    }

    #[test]
    fn later_timestamp_loses_the_tie_break() {
        let key_a = test_key();
        let key_b = test_key();
        let chain = genesis_chain(&key_a, "2000");
        let genesis = chain.head().expect("genesis");

        let mut head = mined_block(&genesis, vec![signed_vote(&key_a, "2000", "12345")], "2000");
        head.timestamp = Some("100.0".to_string());
        chain.accept(head.clone());

        let mut rival = mined_block(&genesis, vec![signed_vote(&key_b, "1000", "5678")], "1000");
        rival.timestamp = Some("200.0".to_string());
        chain.accept(rival);

        assert_eq!(chain.snapshot()[1], head);
        assert!(chain.pool_snapshot().is_empty());
    }

    #[test]
    fn equal_timestamps_fall_back_to_miner_id() {
        let key_a = test_key();
        let key_b = test_key();
        let chain = genesis_chain(&key_a, "2000");
        let genesis = chain.head().expect("genesis");

        let mut head = mined_block(&genesis, vec![signed_vote(&key_a, "2000", "12345")], "2000");
        head.timestamp = Some("150.0".to_string());
        chain.accept(head);

        let mut rival = mined_block(&genesis, vec![signed_vote(&key_b, "1000", "5678")], "1000");
        rival.timestamp = Some("150.0".to_string());
        chain.accept(rival.clone());

        // "1000" < "2000": the incoming block takes the head.
        assert_eq!(chain.snapshot()[1], rival);
    }

    #[test]
    fn empty_chain_accepts_only_a_valid_genesis() {
        let key = test_key();

        // A structurally valid genesis block is admitted.
        let chain = Chain::new();
        let mut genesis = Block::new(
            GENESIS_PREV_HASH.to_string(),
            0,
            vec![BlockData::Vote(signed_vote(&key, GENESIS_ADDR, GENESIS_PREV_HASH))],
            "1234".to_string(),
        );
        genesis.mine();
        chain.accept(genesis.clone());
        assert_eq!(chain.snapshot(), vec![genesis.clone()]);

        // A block with an ordinary prevHash is not.
        let chain = Chain::new();
        let mut stray = mined_block(&genesis, Vec::new(), "1234");
        stray.height = 0;
        stray.prev_hash = "0".repeat(64);
        chain.accept(stray);
        assert!(chain.empty());
    }

    #[test]
    fn install_snapshot_is_served_back_verbatim() {
        let chain = Chain::new();
        let blocks: Vec<Block> = serde_json::from_str(FIXTURE).expect("fixture parses");
        chain.install(blocks.clone());

        assert_eq!(chain.snapshot(), blocks);
        assert_eq!(chain.head().expect("head").height, 1);
    }
}
