//! The peer node.
//!
//! [`Node`] ties the ledger engine to the network: it owns the identity,
//! the participant roster, the chain, the gossip client, and the
//! single-slot mining scheduler. HTTP handlers call into it for every
//! endpoint of the wire protocol, and it calls out through
//! [`ledger::PeerClient`] for bootstrap and broadcast.
//!
//! Concurrency: handlers may run in parallel; the chain and pool are
//! guarded inside [`ledger::Chain`], the roster behind its own mutex.
//! The mining job runs off the request path on a blocking thread and no
//! lock is held across an outbound request or a nonce spin. Broadcast of
//! a self-mined block happens after the block was accepted locally.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;

use ledger::{
    Block, Chain, KeyError, LedgerConfig, PeerClient, PeerError, PeerInfo, Vote, VoteError,
    VoteRecord,
};

use crate::config::NodeConfig;
use crate::identity::Identity;

/// Shared handle to the node, as held by every request handler.
pub type SharedState = Arc<Node>;

/// One network participant.
pub struct Node {
    identity: Identity,
    address: String,
    config: LedgerConfig,
    chain: Chain,
    roster: Mutex<Vec<PeerInfo>>,
    client: PeerClient,
    mine_scheduled: AtomicBool,
}

/// JSON summary served by `GET /status`.
#[derive(Debug, Serialize)]
pub struct NodeStatus {
    pub miner_id: String,
    pub address: String,
    pub chain_height: Option<u64>,
    pub pool_size: usize,
    pub participants: Vec<PeerInfo>,
    pub has_voted: bool,
}

impl Node {
    /// Wires up a node from its configuration and persisted identity.
    pub fn new(config: NodeConfig, identity: Identity) -> Result<SharedState, PeerError> {
        let client = PeerClient::new(config.ledger.request_timeout)?;
        Ok(Arc::new(Self {
            identity,
            address: config.addr,
            config: config.ledger,
            chain: Chain::new(),
            roster: Mutex::new(Vec::new()),
            client,
            mine_scheduled: AtomicBool::new(false),
        }))
    }

    pub fn miner_id(&self) -> &str {
        &self.identity.miner_id
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    fn self_info(&self) -> PeerInfo {
        PeerInfo {
            miner_id: self.identity.miner_id.clone(),
            address: self.address.clone(),
        }
    }

    /// Current roster, for `GET /list`.
    pub fn roster_snapshot(&self) -> Vec<PeerInfo> {
        self.roster.lock().clone()
    }

    /// Adds an advertised peer unless an identical entry already exists.
    pub fn add_participant(&self, peer: PeerInfo) {
        let mut roster = self.roster.lock();
        if !roster.contains(&peer) {
            tracing::info!(miner_id = %peer.miner_id, address = %peer.address, "peer joined");
            roster.push(peer);
        }
    }

    /// One-time startup sequence, run before the transport serves
    /// requests: adopt a roster, advertise, then synchronise the chain
    /// (or mine genesis as the network's first node).
    pub async fn bootstrap(self: Arc<Self>) -> Result<(), KeyError> {
        self.fetch_participant_list().await;
        self.advertise_self().await;
        self.sync_chain().await
    }

    /// Adopts the participant roster from the network.
    ///
    /// The master seeds its own roster and skips the fetch. A node with an
    /// empty roster asks the master (continuing empty on failure). With a
    /// non-empty roster, a random peer is asked instead; a 408 answer
    /// drops that peer and tries another — emptying the roster this way
    /// falls back to the master — and any other failure aborts the
    /// refresh.
    pub async fn fetch_participant_list(&self) {
        if self.address == self.config.master_addr {
            tracing::info!("assuming this node as master");
            return;
        }

        loop {
            let peers = self.roster_snapshot();

            if peers.is_empty() {
                match self.client.fetch_roster(&self.config.master_addr).await {
                    Ok(list) => *self.roster.lock() = list,
                    Err(err) => {
                        tracing::warn!(%err, "could not fetch roster from master node")
                    }
                }
                return;
            }

            let index = rand::thread_rng().gen_range(0..peers.len());
            let peer = &peers[index];
            match self.client.fetch_roster(&peer.address).await {
                Ok(list) => {
                    *self.roster.lock() = list;
                    return;
                }
                Err(PeerError::Timeout) => {
                    tracing::warn!(address = %peer.address, "dropping timed-out peer");
                    self.roster.lock().retain(|p| p != peer);
                }
                Err(err) => {
                    tracing::warn!(%err, "aborting roster refresh");
                    return;
                }
            }
        }
    }

    /// Announces this node to every other peer, then appends itself to
    /// its own roster.
    async fn advertise_self(&self) {
        let me = self.self_info();
        for peer in self.roster_snapshot() {
            if peer.address == self.address {
                continue;
            }
            if let Err(err) = self.client.advertise(&peer.address, &me).await {
                tracing::warn!(address = %peer.address, %err, "failed to advertise");
            }
        }
        self.roster.lock().push(me);
    }

    /// Synchronises the chain from a random peer, or mines genesis when
    /// this node believes itself the sole participant.
    async fn sync_chain(self: Arc<Self>) -> Result<(), KeyError> {
        while self.chain.empty() {
            let peers = self.roster_snapshot();

            if peers.len() > 1 {
                let index = rand::thread_rng().gen_range(0..peers.len());
                let peer = peers[index].clone();
                if peer.address != self.address {
                    match self.client.fetch_chain(&peer.address).await {
                        Ok(blocks) => self.chain.install(blocks),
                        Err(err) => {
                            tracing::warn!(address = %peer.address, %err, "chain fetch failed")
                        }
                    }
                }
            } else {
                tracing::info!("sole participant in the roster, creating genesis block");
                let node = self.clone();
                match tokio::task::spawn_blocking(move || {
                    node.chain
                        .create_genesis(&node.identity.key, &node.identity.miner_id)
                })
                .await
                {
                    Ok(result) => result?,
                    Err(err) => tracing::error!(%err, "genesis mining task failed"),
                }
            }

            if self.chain.empty() {
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }
        Ok(())
    }

    /// Casts this node's single vote.
    ///
    /// Refused with [`VoteError::DoubleVote`] once a vote from this node
    /// is committed or pending, and with [`VoteError::UnknownCandidate`]
    /// unless `addr_to` equals a configured candidate address. On success
    /// the signed record is pooled, gossiped, and a mining job scheduled.
    pub async fn cast_vote(self: Arc<Self>, addr_to: &str) -> Result<VoteRecord, VoteError> {
        if self.chain.has_voted(&self.identity.miner_id) {
            return Err(VoteError::DoubleVote);
        }
        if !self.config.is_candidate(addr_to) {
            return Err(VoteError::UnknownCandidate);
        }

        let mut vote = Vote::new(self.identity.miner_id.clone(), addr_to);
        let record = vote.signed_form(&self.identity.key).map_err(|err| {
            tracing::error!(%err, "failed to sign own vote");
            VoteError::InvalidSignature
        })?;

        self.chain.pool_add(record.clone());
        self.broadcast_vote(&record).await;
        self.schedule_mining();
        Ok(record)
    }

    /// Admits a gossiped vote record.
    ///
    /// Drops silently on a bad signature, an unknown candidate address
    /// (exact match), or a sender that has already voted. An admitted
    /// record schedules a mining job if none is pending.
    pub async fn accept_vote_record(self: Arc<Self>, record: VoteRecord) {
        if !self.chain.validate_vote(&record) {
            return;
        }
        if !self.config.is_candidate(&record.addr_to) {
            tracing::info!(addr_to = %record.addr_to, "dropping vote for unknown candidate");
            return;
        }
        if self.chain.has_voted(&record.addr_from) {
            tracing::info!(addr_from = %record.addr_from, "dropping duplicate vote");
            return;
        }
        if self.chain.pool_add(record) {
            self.schedule_mining();
        }
    }

    /// Hands a gossiped block to the chain's acceptance path.
    pub fn accept_block(&self, block: Block) {
        self.chain.accept(block);
    }

    async fn broadcast_vote(&self, record: &VoteRecord) {
        for peer in self.roster_snapshot() {
            if peer.address == self.address {
                continue;
            }
            match self.client.send_vote(&peer.address, record).await {
                Ok(()) => tracing::info!(address = %peer.address, "sent vote"),
                Err(err) => tracing::warn!(address = %peer.address, %err, "vote gossip failed"),
            }
        }
    }

    async fn broadcast_block(&self, block: &Block) {
        for peer in self.roster_snapshot() {
            if peer.address == self.address {
                continue;
            }
            match self.client.send_block(&peer.address, block).await {
                Ok(()) => tracing::info!(address = %peer.address, "sent block"),
                Err(err) => tracing::warn!(address = %peer.address, %err, "block gossip failed"),
            }
        }
    }

    /// Schedules the deferred mining job, if none is pending.
    ///
    /// At most one job exists per node; it fires once after the
    /// configured delay, mines the pool into a block on a blocking
    /// thread, clears the slot, and broadcasts the block it produced.
    pub fn schedule_mining(self: Arc<Self>) {
        if self
            .mine_scheduled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        tracing::info!(delay = ?self.config.mine_delay, "scheduling mining job");

        tokio::spawn(async move {
            tokio::time::sleep(self.config.mine_delay).await;

            let miner = self.clone();
            let mined = tokio::task::spawn_blocking(move || {
                miner.chain.mine_next(&miner.identity.miner_id)
            })
            .await;
            self.mine_scheduled.store(false, Ordering::SeqCst);

            match mined {
                Ok(Some(block)) => self.broadcast_block(&block).await,
                Ok(None) => tracing::warn!("mining job fired on an empty chain"),
                Err(err) => tracing::error!(%err, "mining task failed"),
            }
        });
    }

    /// Snapshot for the operator-facing `GET /status`.
    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            miner_id: self.identity.miner_id.clone(),
            address: self.address.clone(),
            chain_height: self.chain.head().map(|b| b.height),
            pool_size: self.chain.pool_snapshot().len(),
            participants: self.roster_snapshot(),
            has_voted: self.chain.has_voted(&self.identity.miner_id),
        }
    }
}
