//! # Domain Value Objects
//!
//! Immutable value types exchanged with the network client.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Globally unique transaction identifier.
///
/// One is generated per network call that requires it and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Generate a fresh random transaction id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque genesis block of a channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBlock {
    /// Channel this block configures.
    pub channel_id: String,
    /// Encoded block bytes.
    pub bytes: Vec<u8>,
}

impl GenesisBlock {
    /// Create a genesis block.
    pub fn new(channel_id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            channel_id: channel_id.into(),
            bytes,
        }
    }

    /// Encoded size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if the block carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One peer endpoint, as resolved from configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRef {
    /// Request endpoint (`host:port`).
    pub address: String,
    /// Event service endpoint, if different from `address`.
    pub event_address: Option<String>,
    /// PEM-encoded TLS root certificate.
    pub tls_root_cert: Vec<u8>,
    /// TLS server name override.
    pub hostname_override: Option<String>,
}

impl PeerRef {
    /// Create a peer reference with no TLS material.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            event_address: None,
            tls_root_cert: Vec::new(),
            hostname_override: None,
        }
    }

    /// Set the event service endpoint.
    pub fn with_event_address(mut self, event_address: impl Into<String>) -> Self {
        self.event_address = Some(event_address.into());
        self
    }

    /// Set TLS root certificate and server name override.
    pub fn with_tls(mut self, tls_root_cert: Vec<u8>, hostname_override: Option<String>) -> Self {
        self.tls_root_cert = tls_root_cert;
        self.hostname_override = hostname_override;
        self
    }

    /// Endpoint used to open the block event subscription.
    pub fn event_endpoint(&self) -> &str {
        self.event_address.as_deref().unwrap_or(&self.address)
    }
}

// Certificates are noise in logs.
impl fmt::Debug for PeerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerRef")
            .field("address", &self.address)
            .field("event_address", &self.event_address)
            .field("tls_root_cert_len", &self.tls_root_cert.len())
            .field("hostname_override", &self.hostname_override)
            .finish()
    }
}

/// Block commit notification emitted by a peer's event stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationEvent {
    /// Channel named in the block's channel header.
    pub channel_id: String,
    /// Block number on that channel.
    pub block_number: u64,
    /// Number of transactions in the block.
    pub transaction_count: usize,
}

impl ConfirmationEvent {
    /// A config block (single transaction) for `channel_id`.
    pub fn config_block(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            block_number: 0,
            transaction_count: 1,
        }
    }

    /// A regular block with `transaction_count` transactions.
    pub fn data_block(
        channel_id: impl Into<String>,
        block_number: u64,
        transaction_count: usize,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            block_number,
            transaction_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_ids_are_distinct() {
        let a = TransactionId::new();
        let b = TransactionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_event_endpoint_falls_back_to_address() {
        let peer = PeerRef::new("peer0:7051");
        assert_eq!(peer.event_endpoint(), "peer0:7051");

        let peer = peer.with_event_address("peer0:7053");
        assert_eq!(peer.event_endpoint(), "peer0:7053");
    }

    #[test]
    fn test_debug_hides_certificate() {
        let peer = PeerRef::new("peer0:7051").with_tls(b"-----BEGIN".to_vec(), None);
        let dbg = format!("{:?}", peer);
        assert!(dbg.contains("tls_root_cert_len: 10"));
        assert!(!dbg.contains("BEGIN"));
    }

    #[test]
    fn test_config_block_has_single_transaction() {
        let event = ConfirmationEvent::config_block("mychannel");
        assert_eq!(event.transaction_count, 1);
    }
}
