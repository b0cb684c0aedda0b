//! Vote transactions and their signing scheme.
//!
//! A vote is the only transaction kind in the ledger: one participant
//! (`addr_from`) endorses one candidate (`addr_to`). The participant signs
//! the canonical `{"addr_from": .., "addr_to": ..}` image with its RSA key
//! and ships the result as a [`VoteRecord`] carrying the base64 signature
//! and the wire-encoded public key, so any peer can verify the record
//! without a key registry.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::error::{KeyError, VoteError};
use crate::keys::{self, IdentityKey};

/// An unsigned (or lazily signed) vote under construction.
///
/// The signature is produced at most once; repeated calls to [`Vote::sign`]
/// or [`Vote::signed_form`] reuse the stored value.
#[derive(Clone, Debug)]
pub struct Vote {
    addr_from: String,
    addr_to: String,
    signature: Option<String>,
}

impl Vote {
    /// Records the endpoints of a vote; the signature is unset.
    pub fn new(addr_from: impl Into<String>, addr_to: impl Into<String>) -> Self {
        Self {
            addr_from: addr_from.into(),
            addr_to: addr_to.into(),
            signature: None,
        }
    }

    /// The UTF-8 bytes of the canonical signing image.
    ///
    /// Field order is significant: these bytes feed both the signature and
    /// its verification on every peer.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical::vote_signing_image(&self.addr_from, &self.addr_to).into_bytes()
    }

    /// Signs the canonical image and stores the base64 signature.
    ///
    /// Idempotent: once a signature is stored, later calls keep it.
    pub fn sign(&mut self, key: &IdentityKey) -> Result<(), KeyError> {
        if self.signature.is_none() {
            let raw = key.sign(&self.canonical_bytes())?;
            self.signature = Some(BASE64.encode(raw));
        }
        Ok(())
    }

    /// Returns the full signed wire record, signing first if needed.
    pub fn signed_form(&mut self, key: &IdentityKey) -> Result<VoteRecord, KeyError> {
        self.sign(key)?;
        let signature = self
            .signature
            .clone()
            .unwrap_or_default();
        Ok(VoteRecord {
            addr_from: self.addr_from.clone(),
            addr_to: self.addr_to.clone(),
            signature,
            pubkey: key.public_wire()?,
        })
    }
}

/// A signed vote as it travels between peers and inside blocks.
///
/// Wire field order — `addr_from`, `addr_to`, `signature`, `pubkey` — is
/// part of the hash contract for blocks containing the record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// Participant identifier of the voter.
    pub addr_from: String,
    /// Candidate address receiving the vote.
    pub addr_to: String,
    /// Base64 RSA-PKCS#1-v1.5 signature over the canonical vote image.
    pub signature: String,
    /// Wire-encoded signer public key (`base64(PEM ++ "==")`).
    pub pubkey: String,
}

impl VoteRecord {
    /// Verifies the record's signature against its embedded public key.
    ///
    /// The canonical image is reconstructed from `addr_from`/`addr_to`, so
    /// a record altered anywhere fails here.
    pub fn verify(&self) -> Result<(), VoteError> {
        let signature = BASE64
            .decode(&self.signature)
            .map_err(|_| VoteError::InvalidSignature)?;
        let message = canonical::vote_signing_image(&self.addr_from, &self.addr_to);
        keys::verify_wire(&self.pubkey, message.as_bytes(), &signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> IdentityKey {
        IdentityKey::generate(1024).expect("keygen")
    }

    #[test]
    fn signed_form_verifies_against_itself() {
        let key = test_key();
        let mut vote = Vote::new("1234", "4567");

        let record = vote.signed_form(&key).expect("signed form");
        assert_eq!(record.addr_from, "1234");
        assert_eq!(record.addr_to, "4567");
        assert!(record.verify().is_ok());
    }

    #[test]
    fn signing_is_idempotent() {
        let key = test_key();
        let mut vote = Vote::new("1234", "4567");

        let first = vote.signed_form(&key).expect("signed form");
        let second = vote.signed_form(&key).expect("signed form");
        assert_eq!(first.signature, second.signature);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let key = test_key();
        let mut vote = Vote::new("1234", "4567");
        let mut record = vote.signed_form(&key).expect("signed form");

        // Flip one base64 character of the signature.
        let mut chars: Vec<char> = record.signature.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        record.signature = chars.into_iter().collect();

        assert_eq!(record.verify(), Err(VoteError::InvalidSignature));
    }

    #[test]
    fn tampered_endpoints_are_rejected() {
        let key = test_key();
        let mut vote = Vote::new("1234", "4567");
        let mut record = vote.signed_form(&key).expect("signed form");

        record.addr_to = "9999".to_string();
        assert_eq!(record.verify(), Err(VoteError::InvalidSignature));
    }

    #[test]
    fn record_survives_json_roundtrip() {
        let key = test_key();
        let mut vote = Vote::new("1234", "4567");
        let record = vote.signed_form(&key).expect("signed form");

        let json = serde_json::to_string(&record).expect("serialise");
        let back: VoteRecord = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(record, back);
        assert!(back.verify().is_ok());
    }
}
