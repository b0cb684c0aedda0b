//! Node configuration.
//!
//! The address doubles as the node's identity on the roster and the bind
//! address of its HTTP listener, so it stays a `host:port` string rather
//! than a parsed `SocketAddr` (roster membership and the master check are
//! string comparisons).

use std::env;
use std::path::PathBuf;

use ledger::LedgerConfig;

/// Configuration for one voting node process.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// `host:port` this node binds to and advertises to peers.
    pub addr: String,
    /// Directory holding `private_key.pem` and `miner_id.txt`.
    pub data_dir: PathBuf,
    /// Shared ledger parameters (master address, candidates, delays).
    pub ledger: LedgerConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            addr: "localhost:5000".to_string(),
            data_dir: PathBuf::from("."),
            ledger: LedgerConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Builds a config from defaults, environment overrides
    /// (`NODE_ADDR`, `MASTER_ADDR`, `NODE_DATA_DIR`), and an optional
    /// first CLI argument overriding the listen address.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(addr) = env::var("NODE_ADDR") {
            cfg.addr = addr;
        }
        if let Ok(master) = env::var("MASTER_ADDR") {
            cfg.ledger.master_addr = master;
        }
        if let Ok(dir) = env::var("NODE_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Some(addr) = env::args().nth(1) {
            cfg.addr = addr;
        }
        cfg
    }

    /// True iff this node is the well-known bootstrap peer.
    pub fn is_master(&self) -> bool {
        self.addr == self.ledger.master_addr
    }
}
