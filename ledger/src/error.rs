use std::fmt;

/// Error type for key handling and signing.
#[derive(Debug)]
pub enum KeyError {
    /// Key generation failed.
    Generate(String),
    /// PEM encoding or decoding failed.
    Pem(String),
    /// Base64 or UTF-8 decoding of wire material failed.
    Decode(String),
    /// Producing a signature failed.
    Sign(String),
}

/// Errors raised by vote construction and admission.
///
/// Only `DoubleVote` and `UnknownCandidate` ever reach the operator; the
/// receive path drops invalid records silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteError {
    /// The record's signature does not verify against its public key.
    InvalidSignature,
    /// This node (or the record's sender) has already voted.
    DoubleVote,
    /// The destination is not one of the configured candidates.
    UnknownCandidate,
}

/// Errors raised by outbound peer requests.
#[derive(Debug)]
pub enum PeerError {
    /// The peer was unreachable or the transport failed mid-request.
    Network(String),
    /// The peer answered 408; the caller drops it from the roster.
    Timeout,
    /// The peer answered some other non-200 status.
    Status(u16),
    /// The response body could not be decoded.
    Protocol(String),
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::Generate(msg) => write!(f, "key generation failed: {msg}"),
            KeyError::Pem(msg) => write!(f, "PEM error: {msg}"),
            KeyError::Decode(msg) => write!(f, "wire decoding error: {msg}"),
            KeyError::Sign(msg) => write!(f, "signing failed: {msg}"),
        }
    }
}

impl fmt::Display for VoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteError::InvalidSignature => write!(f, "invalid signature"),
            VoteError::DoubleVote => write!(f, "participant has already voted"),
            VoteError::UnknownCandidate => write!(f, "unknown candidate address"),
        }
    }
}

impl fmt::Display for PeerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerError::Network(msg) => write!(f, "peer unreachable: {msg}"),
            PeerError::Timeout => write!(f, "peer timed out (408)"),
            PeerError::Status(code) => write!(f, "peer returned status {code}"),
            PeerError::Protocol(msg) => write!(f, "undecodable peer response: {msg}"),
        }
    }
}

impl std::error::Error for KeyError {}
impl std::error::Error for VoteError {}
impl std::error::Error for PeerError {}
