//! # Domain Errors
//!
//! Error taxonomy for channel join coordination.
//!
//! Every failure inside a join invocation is expressed with one of these
//! types and carried back to the caller inside a [`JoinOutcome`]. Nothing is
//! raised past the coordinator.
//!
//! [`JoinOutcome`]: super::JoinOutcome

use serde::Serialize;
use thiserror::Error;

/// Errors reported by the outbound network client ports.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum NetworkError {
    /// The organization is not known to the client.
    #[error("Unknown organization: {0}")]
    UnknownOrganization(String),

    /// The acting identity could not be resolved for the organization.
    #[error("Unknown identity '{identity}' for organization '{organization}'")]
    UnknownIdentity {
        /// Identity that was requested
        identity: String,
        /// Organization it was requested for
        organization: String,
    },

    /// A connection to a peer or service could not be opened.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The request was sent but the transport failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote side refused the request.
    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// Why a single peer's confirmation listener did not resolve.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum ListenerError {
    /// No qualifying block event arrived before the deadline.
    #[error("No confirmation within {timeout_ms} ms")]
    Timeout {
        /// Configured wait in milliseconds
        timeout_ms: u64,
    },

    /// The peer committed a config block for a different channel.
    #[error("Channel mismatch: expected '{expected}', peer committed '{actual}'")]
    ChannelMismatch {
        /// Channel the join was issued for
        expected: String,
        /// Channel reported by the peer
        actual: String,
    },

    /// The peer's event stream reported an error or closed.
    #[error("Event stream error: {0}")]
    StreamError(String),
}

/// Failures of the join submission call.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum SubmitError {
    /// Network or transport failure while submitting.
    #[error("Join submission transport failure: {0}")]
    Transport(String),

    /// The response envelope could not be interpreted.
    #[error("Malformed join response: {0}")]
    MalformedResponse(String),

    /// A peer answered with a non-success status.
    #[error("Peer {peer} rejected join with status {status}: {message}")]
    Rejected {
        /// Peer that rejected the request
        peer: String,
        /// Status code returned
        status: u16,
        /// Message returned alongside the status
        message: String,
    },
}

/// Top-level join error.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum JoinError {
    /// No target peers were supplied.
    #[error("No target peers supplied for channel join")]
    NoTargetPeers,

    /// Channel, organization or identity could not be resolved.
    #[error("Failed to resolve channel for organization: {0}")]
    ConfigResolution(NetworkError),

    /// Genesis block could not be fetched.
    #[error("Failed to fetch genesis block: {0}")]
    GenesisFetch(NetworkError),

    /// A target peer could not be connected or subscribed to.
    #[error("Failed to open event subscription on peer {peer}: {source}")]
    PeerConnection {
        /// Peer address
        peer: String,
        /// Underlying network failure
        source: NetworkError,
    },

    /// The join submission failed.
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// A peer did not confirm the join.
    #[error("Peer {peer} did not confirm join: {source}")]
    Listener {
        /// Peer address
        peer: String,
        /// Listener failure
        source: ListenerError,
    },

    /// Releasing a subscription failed. Logged, never escalated.
    #[error("Failed to release subscription on peer {peer}: {reason}")]
    Cleanup {
        /// Peer address
        peer: String,
        /// Failure reason
        reason: String,
    },
}

impl JoinError {
    /// True for errors raised before any subscription was opened.
    pub fn is_fatal_before_listeners(&self) -> bool {
        matches!(
            self,
            JoinError::NoTargetPeers | JoinError::ConfigResolution(_) | JoinError::GenesisFetch(_)
        )
    }
}
