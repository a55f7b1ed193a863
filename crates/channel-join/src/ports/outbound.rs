//! # Outbound Ports
//!
//! Traits for the network client collaborator: channel handles, peer
//! connections and block event subscriptions.

use crate::domain::{ConfirmationEvent, GenesisBlock, NetworkError, PeerRef, SubmitResponse, TransactionId};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One item of a peer's block event stream. `Err` carries the stream's error cause.
pub type BlockEventResult = Result<ConfirmationEvent, String>;

/// Sending half handed to whatever produces a peer's block events.
pub type BlockEventSender = mpsc::UnboundedSender<BlockEventResult>;

/// Receiving half of a block event subscription.
///
/// Consumed by exactly one confirmation listener. Dropping it does not
/// release the subscription on the peer.
#[derive(Debug)]
pub struct BlockEventStream {
    receiver: mpsc::UnboundedReceiver<BlockEventResult>,
}

impl BlockEventStream {
    /// Create a connected sender/stream pair.
    pub fn channel() -> (BlockEventSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { receiver: rx })
    }

    /// Next event, or `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<BlockEventResult> {
        self.receiver.recv().await
    }
}

/// Release handle of one open block event registration on one peer.
///
/// Implementations must make `release` idempotent.
pub trait EventSubscription: Send + Sync {
    /// Peer this subscription is registered on.
    fn peer(&self) -> &str;

    /// Is the registration still open?
    fn is_active(&self) -> bool;

    /// Unregister and disconnect.
    fn release(&self) -> Result<(), NetworkError>;
}

/// Result of subscribing: the release handle and the event stream.
///
/// The two halves have different owners. The coordinator keeps `handle`,
/// the listener consumes `events`.
pub struct BlockSubscription {
    /// Release handle. Keeps the registration alive after the
    /// `PeerConnection` that produced it is dropped.
    pub handle: Box<dyn EventSubscription>,
    /// Event stream.
    pub events: BlockEventStream,
}

/// Live connection to one peer's event service.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Peer address.
    fn address(&self) -> &str;

    /// Register for block commit events.
    async fn subscribe_block_events(&self) -> Result<BlockSubscription, NetworkError>;
}

/// Channel handle bound to one organization and acting identity.
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel this handle operates on.
    fn channel_id(&self) -> &str;

    /// Generate a fresh transaction id.
    fn new_transaction_id(&self) -> TransactionId;

    /// Fetch the channel's genesis block from the ordering service.
    async fn genesis_block(&self, tx_id: TransactionId) -> Result<GenesisBlock, NetworkError>;

    /// Send the join proposal to `targets`.
    async fn join_channel(
        &self,
        targets: &[PeerRef],
        tx_id: TransactionId,
        genesis: &GenesisBlock,
    ) -> Result<SubmitResponse, NetworkError>;
}

/// Network client - outbound port.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Resolve a channel handle for `organization` acting as `identity`.
    async fn channel_handle(
        &self,
        channel_id: &str,
        identity: &str,
        organization: &str,
    ) -> Result<Arc<dyn ChannelHandle>, NetworkError>;

    /// Open a fresh connection to a peer's event service.
    async fn connect_peer(&self, peer: &PeerRef) -> Result<Box<dyn PeerConnection>, NetworkError>;
}
