//! Ledger configuration.
//!
//! Defaults mirror the reference network: the well-known master node at
//! `localhost:5000`, three fixed candidates, a five-second mining delay,
//! and 1024-bit RSA identity keys (larger moduli are allowed).

use std::time::Duration;

/// A valid destination for a vote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Display name of the candidate.
    pub name: String,
    /// Opaque candidate address votes are cast to.
    pub address: String,
}

impl Candidate {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Parameters shared by every component of the ledger engine.
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Address of the well-known bootstrap peer.
    pub master_addr: String,
    /// The fixed candidate roster; `addr_to` must match one exactly.
    pub candidates: Vec<Candidate>,
    /// Delay between the first pool admission and the mining job firing.
    pub mine_delay: Duration,
    /// Modulus size for freshly generated identity keys.
    pub key_bits: usize,
    /// Timeout for outbound peer requests.
    pub request_timeout: Duration,
}

impl LedgerConfig {
    /// True iff `address` is exactly one of the configured candidates.
    pub fn is_candidate(&self, address: &str) -> bool {
        self.candidates.iter().any(|c| c.address == address)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            master_addr: "localhost:5000".to_string(),
            candidates: vec![
                Candidate::new("Candidate 1", "12345"),
                Candidate::new("Candidate 2", "5678"),
                Candidate::new("Candidate 3", "9999"),
            ],
            mine_delay: Duration::from_secs(5),
            key_bits: 1024,
            request_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_matching_is_exact() {
        let config = LedgerConfig::default();

        assert!(config.is_candidate("12345"));
        assert!(config.is_candidate("5678"));
        assert!(config.is_candidate("9999"));

        // Substrings of candidate addresses are not candidates.
        assert!(!config.is_candidate("123"));
        assert!(!config.is_candidate("234"));
        assert!(!config.is_candidate(""));
    }
}
