//! In-Memory Network Adapter
//!
//! Implements the network client ports without any I/O. Each peer follows a
//! scripted [`PeerBehavior`]; the scripted block events are only emitted
//! when a join submission naming that peer arrives, so a listener that
//! registers after submission misses them, as it would against a real peer.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::{
    ConfirmationEvent, GenesisBlock, NetworkError, PeerRef, PeerResponse, SubmitResponse,
    TransactionId,
};
use crate::ports::{
    BlockEventSender, BlockEventStream, BlockSubscription, ChannelHandle, EventSubscription,
    NetworkClient, PeerConnection,
};

/// How a simulated peer reacts to a join submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerBehavior {
    /// Commit the channel's config block immediately.
    Confirm,
    /// Commit the config block after a delay.
    ConfirmAfter(Duration),
    /// Never emit anything.
    Silent,
    /// Commit a config block for another channel.
    WrongChannel(String),
    /// Report an error on the event stream.
    StreamError(String),
    /// Emit a multi-transaction block for another channel, then confirm.
    NoiseThenConfirm,
    /// Close the event stream without emitting anything.
    CloseStream,
    /// Refuse connections.
    Unreachable,
}

#[derive(Default)]
struct NetworkState {
    behaviors: HashMap<String, PeerBehavior>,
    statuses: HashMap<String, (u16, String)>,
    members: HashSet<(String, String)>,
    listeners: HashMap<u64, (String, BlockEventSender)>,
    next_subscription: u64,
    fail_genesis: Option<String>,
    fail_submit: Option<String>,
    fail_release: bool,
    submit_delay: Option<Duration>,
    opened: usize,
    released: usize,
    release_calls: usize,
    transaction_ids: Vec<TransactionId>,
    submissions: Vec<Vec<String>>,
    open_at_submit: Vec<usize>,
}

impl NetworkState {
    fn senders_for(&self, peer: &str) -> Vec<BlockEventSender> {
        self.listeners
            .values()
            .filter(|(p, _)| p == peer)
            .map(|(_, tx)| tx.clone())
            .collect()
    }

    fn close_streams_for(&mut self, peer: &str) {
        self.listeners.retain(|_, (p, _)| p != peer);
    }
}

/// Scripted in-memory network.
#[derive(Clone, Default)]
pub struct InMemoryNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl InMemoryNetwork {
    /// Empty network with no members.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `identity` to act for `organization`.
    pub fn with_member(self, organization: &str, identity: &str) -> Self {
        self.state
            .lock()
            .members
            .insert((organization.to_string(), identity.to_string()));
        self
    }

    /// Script the peer at `address`. Unscripted peers confirm.
    pub fn with_peer(self, address: &str, behavior: PeerBehavior) -> Self {
        self.state
            .lock()
            .behaviors
            .insert(address.to_string(), behavior);
        self
    }

    /// Make the peer at `address` answer the submission with `status`.
    pub fn with_status(self, address: &str, status: u16, message: &str) -> Self {
        self.state
            .lock()
            .statuses
            .insert(address.to_string(), (status, message.to_string()));
        self
    }

    /// Fail genesis block fetches.
    pub fn failing_genesis(self, reason: &str) -> Self {
        self.state.lock().fail_genesis = Some(reason.to_string());
        self
    }

    /// Fail join submissions with a transport error.
    pub fn failing_submit(self, reason: &str) -> Self {
        self.state.lock().fail_submit = Some(reason.to_string());
        self
    }

    /// Make every subscription release fail.
    pub fn failing_release(self) -> Self {
        self.state.lock().fail_release = true;
        self
    }

    /// Delay the submission response.
    pub fn with_submit_delay(self, delay: Duration) -> Self {
        self.state.lock().submit_delay = Some(delay);
        self
    }

    /// Subscriptions opened so far.
    pub fn subscriptions_opened(&self) -> usize {
        self.state.lock().opened
    }

    /// Subscriptions actually released (each counted once).
    pub fn subscriptions_released(&self) -> usize {
        self.state.lock().released
    }

    /// Calls made to `release`, including repeats.
    pub fn release_calls(&self) -> usize {
        self.state.lock().release_calls
    }

    /// Subscriptions still registered.
    pub fn open_subscriptions(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Every transaction id handed out, in order.
    pub fn transaction_ids(&self) -> Vec<TransactionId> {
        self.state.lock().transaction_ids.clone()
    }

    /// Target addresses of every submission received.
    pub fn submissions(&self) -> Vec<Vec<String>> {
        self.state.lock().submissions.clone()
    }

    /// Registered subscriptions at the moment of each submission.
    pub fn open_at_submit(&self) -> Vec<usize> {
        self.state.lock().open_at_submit.clone()
    }

    fn behavior(&self, address: &str) -> PeerBehavior {
        self.state
            .lock()
            .behaviors
            .get(address)
            .cloned()
            .unwrap_or(PeerBehavior::Confirm)
    }
}

#[async_trait]
impl NetworkClient for InMemoryNetwork {
    async fn channel_handle(
        &self,
        channel_id: &str,
        identity: &str,
        organization: &str,
    ) -> Result<Arc<dyn ChannelHandle>, NetworkError> {
        let state = self.state.lock();
        if !state.members.iter().any(|(org, _)| org == organization) {
            return Err(NetworkError::UnknownOrganization(organization.to_string()));
        }
        if !state
            .members
            .contains(&(organization.to_string(), identity.to_string()))
        {
            return Err(NetworkError::UnknownIdentity {
                identity: identity.to_string(),
                organization: organization.to_string(),
            });
        }
        Ok(Arc::new(InMemoryChannel {
            channel_id: channel_id.to_string(),
            network: self.clone(),
        }))
    }

    async fn connect_peer(&self, peer: &PeerRef) -> Result<Box<dyn PeerConnection>, NetworkError> {
        if self.behavior(&peer.address) == PeerBehavior::Unreachable {
            return Err(NetworkError::Connection(format!(
                "{} refused connection",
                peer.event_endpoint()
            )));
        }
        Ok(Box::new(InMemoryPeer {
            address: peer.address.clone(),
            network: self.clone(),
        }))
    }
}

struct InMemoryChannel {
    channel_id: String,
    network: InMemoryNetwork,
}

impl InMemoryChannel {
    fn emit(&self, address: &str) {
        let behavior = self.network.behavior(address);
        let senders = self.network.state.lock().senders_for(address);
        let channel_id = self.channel_id.clone();

        match behavior {
            PeerBehavior::Confirm => {
                for tx in senders {
                    let _ = tx.send(Ok(ConfirmationEvent::config_block(&channel_id)));
                }
            }
            PeerBehavior::ConfirmAfter(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    for tx in senders {
                        let _ = tx.send(Ok(ConfirmationEvent::config_block(&channel_id)));
                    }
                });
            }
            PeerBehavior::WrongChannel(other) => {
                for tx in senders {
                    let _ = tx.send(Ok(ConfirmationEvent::config_block(&other)));
                }
            }
            PeerBehavior::StreamError(cause) => {
                for tx in senders {
                    let _ = tx.send(Err(cause.clone()));
                }
            }
            PeerBehavior::NoiseThenConfirm => {
                for tx in senders {
                    let _ = tx.send(Ok(ConfirmationEvent::data_block("system-channel", 17, 4)));
                    let _ = tx.send(Ok(ConfirmationEvent::config_block(&channel_id)));
                }
            }
            PeerBehavior::CloseStream => {
                drop(senders);
                self.network.state.lock().close_streams_for(address);
            }
            PeerBehavior::Silent | PeerBehavior::Unreachable => {}
        }
    }
}

#[async_trait]
impl ChannelHandle for InMemoryChannel {
    fn channel_id(&self) -> &str {
        &self.channel_id
    }

    fn new_transaction_id(&self) -> TransactionId {
        let id = TransactionId::new();
        self.network.state.lock().transaction_ids.push(id);
        id
    }

    async fn genesis_block(&self, tx_id: TransactionId) -> Result<GenesisBlock, NetworkError> {
        debug!(channel = %self.channel_id, %tx_id, "[channel-join] In-memory genesis fetch");
        let fail = self.network.state.lock().fail_genesis.clone();
        if let Some(reason) = fail {
            return Err(NetworkError::Rejected(reason));
        }
        let mut bytes = self.channel_id.as_bytes().to_vec();
        bytes.extend_from_slice(tx_id.as_uuid().as_bytes());
        Ok(GenesisBlock::new(&self.channel_id, bytes))
    }

    async fn join_channel(
        &self,
        targets: &[PeerRef],
        tx_id: TransactionId,
        genesis: &GenesisBlock,
    ) -> Result<SubmitResponse, NetworkError> {
        let (fail, delay) = {
            let mut state = self.network.state.lock();
            let open = state.listeners.len();
            state.open_at_submit.push(open);
            state
                .submissions
                .push(targets.iter().map(|p| p.address.clone()).collect());
            (state.fail_submit.clone(), state.submit_delay)
        };

        debug!(
            channel = %self.channel_id,
            %tx_id,
            genesis_bytes = genesis.len(),
            "[channel-join] In-memory join submission"
        );

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = fail {
            return Err(NetworkError::Transport(reason));
        }

        let mut responses = Vec::with_capacity(targets.len());
        for peer in targets {
            self.emit(&peer.address);
            let status = self.network.state.lock().statuses.get(&peer.address).cloned();
            responses.push(match status {
                Some((status, message)) => PeerResponse::with_status(&peer.address, status, message),
                None => PeerResponse::accepted(&peer.address),
            });
        }
        Ok(SubmitResponse::new(responses))
    }
}

struct InMemoryPeer {
    address: String,
    network: InMemoryNetwork,
}

#[async_trait]
impl PeerConnection for InMemoryPeer {
    fn address(&self) -> &str {
        &self.address
    }

    async fn subscribe_block_events(&self) -> Result<BlockSubscription, NetworkError> {
        let (tx, events) = BlockEventStream::channel();
        let id = {
            let mut state = self.network.state.lock();
            let id = state.next_subscription;
            state.next_subscription += 1;
            state.opened += 1;
            state.listeners.insert(id, (self.address.clone(), tx));
            id
        };
        Ok(BlockSubscription {
            handle: Box::new(InMemorySubscription {
                id,
                peer: self.address.clone(),
                active: AtomicBool::new(true),
                network: self.network.clone(),
            }),
            events,
        })
    }
}

struct InMemorySubscription {
    id: u64,
    peer: String,
    active: AtomicBool,
    network: InMemoryNetwork,
}

impl EventSubscription for InMemorySubscription {
    fn peer(&self) -> &str {
        &self.peer
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn release(&self) -> Result<(), NetworkError> {
        let mut state = self.network.state.lock();
        state.release_calls += 1;
        if state.fail_release {
            return Err(NetworkError::Connection(format!("{} did not acknowledge disconnect", self.peer)));
        }
        if self.active.swap(false, Ordering::SeqCst) {
            state.released += 1;
            state.listeners.remove(&self.id);
        }
        Ok(())
    }
}
