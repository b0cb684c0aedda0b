//! Persistent node identity.
//!
//! A node is its miner id plus its RSA keypair. Both are created on the
//! first run and written to the data dir (`miner_id.txt`,
//! `private_key.pem`); every later start loads them verbatim, so the
//! identity — and with it the one-vote rule — survives restarts. The
//! files are written exactly once and never rewritten concurrently.

use std::fmt;
use std::fs;
use std::path::Path;

use rand::Rng;

use ledger::{IdentityKey, KeyError};

const KEY_FILE: &str = "private_key.pem";
const ID_FILE: &str = "miner_id.txt";

/// A node's stable identity.
#[derive(Clone)]
pub struct Identity {
    /// Decimal-string miner id, also the `addr_from` of this node's vote.
    pub miner_id: String,
    /// RSA keypair signing this node's vote.
    pub key: IdentityKey,
}

/// Errors while loading or creating the identity files.
#[derive(Debug)]
pub enum IdentityError {
    Io(std::io::Error),
    Key(KeyError),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::Io(e) => write!(f, "identity file error: {e}"),
            IdentityError::Key(e) => write!(f, "identity key error: {e}"),
        }
    }
}

impl std::error::Error for IdentityError {}

impl From<std::io::Error> for IdentityError {
    fn from(e: std::io::Error) -> Self {
        IdentityError::Io(e)
    }
}

impl From<KeyError> for IdentityError {
    fn from(e: KeyError) -> Self {
        IdentityError::Key(e)
    }
}

/// Loads the identity from `dir`, creating and persisting a fresh one if
/// the key file is absent.
pub fn load_or_create(dir: &Path, key_bits: usize) -> Result<Identity, IdentityError> {
    let key_path = dir.join(KEY_FILE);
    let id_path = dir.join(ID_FILE);

    if key_path.is_file() {
        tracing::info!(path = %key_path.display(), "loading identity");
        let pem = fs::read_to_string(&key_path)?;
        let key = IdentityKey::from_pem(&pem)?;
        let miner_id = fs::read_to_string(&id_path)?.trim().to_string();
        return Ok(Identity { miner_id, key });
    }

    let miner_id = rand::thread_rng().gen_range(0..=10_000u32).to_string();
    tracing::info!(%miner_id, "creating new identity");

    fs::create_dir_all(dir)?;
    fs::write(&id_path, &miner_id)?;

    let key = IdentityKey::generate(key_bits)?;
    fs::write(&key_path, key.to_pem()?)?;

    Ok(Identity { miner_id, key })
}
