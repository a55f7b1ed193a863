//! # Join Coordinator
//!
//! Application service driving one channel join end to end.
//!
//! ## Invocation Sequence
//!
//! 1. Resolve the channel handle; fetch the genesis block under a fresh tx id
//! 2. Generate a second tx id for the join proposal
//! 3. Open one block event subscription per target peer
//! 4. Submit the join while every listener waits (register-then-submit)
//! 5. Wait for the submission and every listener to settle
//! 6. Release every opened subscription
//! 7. Fold everything into a [`JoinOutcome`]

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::cleanup::SubscriptionSet;
use super::submitter::submit_join;
use crate::algorithms::{decide_outcome, ConfirmationListener};
use crate::config::ChannelJoinConfig;
use crate::domain::{
    invariant_all_released, invariant_distinct_transaction_ids,
    invariant_one_subscription_per_peer, CleanupReport, GenesisBlock, JoinError, JoinOutcome,
    JoinRequest, PeerOutcome, PeerRef, TransactionId,
};
use crate::ports::{BlockSubscription, ChannelHandle, ChannelJoinApi, NetworkClient};

/// Join Coordinator - orchestrates a channel join across an organization's peers.
pub struct JoinCoordinator<C: NetworkClient> {
    /// Network client collaborator.
    client: Arc<C>,
    /// Per-peer confirmation deadline.
    event_wait_timeout: Duration,
}

impl<C: NetworkClient> JoinCoordinator<C> {
    /// Create a coordinator from configuration.
    pub fn new(client: Arc<C>, config: &ChannelJoinConfig) -> Self {
        Self {
            client,
            event_wait_timeout: config.event_wait_timeout(),
        }
    }

    /// Create with an explicit per-peer timeout.
    pub fn with_timeout(client: Arc<C>, event_wait_timeout: Duration) -> Self {
        Self {
            client,
            event_wait_timeout,
        }
    }

    /// Per-peer confirmation deadline.
    pub fn event_wait_timeout(&self) -> Duration {
        self.event_wait_timeout
    }

    /// Run one join invocation. Never fails; see [`JoinOutcome`].
    pub async fn join(&self, request: JoinRequest) -> JoinOutcome {
        info!(
            org = %request.organization,
            channel = %request.channel_id,
            peers = request.target_peers.len(),
            "[channel-join] Calling peers in organization to join the channel"
        );

        if request.target_peers.is_empty() {
            error!("[channel-join] Join requested with no target peers");
            return JoinOutcome::failed(JoinError::NoTargetPeers, Vec::new(), CleanupReport::default());
        }

        let (channel, genesis_tx, genesis) = match self.prepare(&request).await {
            Ok(prepared) => prepared,
            Err(e) => {
                error!(error = %e, "[channel-join] Failed to join channel");
                return JoinOutcome::failed(e, Vec::new(), CleanupReport::default());
            }
        };

        let join_tx = channel.new_transaction_id();
        if !invariant_distinct_transaction_ids(&[genesis_tx, join_tx]) {
            warn!(tx_id = %join_tx, "[channel-join] Network client reused a transaction id");
        }

        let mut subscriptions = SubscriptionSet::new();
        let (verdict, peers) = self
            .confirm_join(&request, channel.as_ref(), &genesis, join_tx, &mut subscriptions)
            .await;
        let cleanup = subscriptions.release_all();

        if !invariant_all_released(&cleanup) {
            error!(?cleanup, "[channel-join] Subscription cleanup incomplete");
        }

        match verdict {
            Ok(()) => {
                info!(
                    org = %request.organization,
                    channel = %request.channel_id,
                    "[channel-join] Successfully joined peers in organization to the channel"
                );
                JoinOutcome::succeeded(&request.organization, &request.channel_id, peers, cleanup)
            }
            Err(e) => {
                error!(error = %e, "[channel-join] Failed to join channel");
                JoinOutcome::failed(e, peers, cleanup)
            }
        }
    }

    /// Channel handle, genesis tx id and genesis block.
    async fn prepare(
        &self,
        request: &JoinRequest,
    ) -> Result<(Arc<dyn ChannelHandle>, TransactionId, GenesisBlock), JoinError> {
        let channel = self
            .client
            .channel_handle(
                &request.channel_id,
                &request.acting_identity,
                &request.organization,
            )
            .await
            .map_err(JoinError::ConfigResolution)?;

        debug!(
            org = %request.organization,
            identity = %request.acting_identity,
            "[channel-join] Received channel handle for organization admin"
        );

        let tx_id = channel.new_transaction_id();
        let genesis = channel
            .genesis_block(tx_id)
            .await
            .map_err(JoinError::GenesisFetch)?;

        debug!(
            channel = %request.channel_id,
            tx_id = %tx_id,
            bytes = genesis.len(),
            "[channel-join] Fetched genesis block"
        );
        Ok((channel, tx_id, genesis))
    }

    /// Subscribe, submit, join on every outcome.
    ///
    /// Every opened subscription handle is moved into `subscriptions` before
    /// this returns, on every path.
    async fn confirm_join(
        &self,
        request: &JoinRequest,
        channel: &dyn ChannelHandle,
        genesis: &GenesisBlock,
        join_tx: TransactionId,
        subscriptions: &mut SubscriptionSet,
    ) -> (Result<(), JoinError>, Vec<PeerOutcome>) {
        let mut listeners = Vec::with_capacity(request.target_peers.len());
        for peer in &request.target_peers {
            let subscription = match self.open_subscription(peer).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    error!(error = %e, "[channel-join] Aborting join before submission");
                    return (Err(e), Vec::new());
                }
            };
            subscriptions.push(subscription.handle);

            let listener = ConfirmationListener::new(
                peer.address.clone(),
                request.channel_id.clone(),
                self.event_wait_timeout,
            );
            let events = subscription.events;
            listeners.push(async move {
                let peer = listener.peer().to_string();
                let result = listener.await_confirmation(events).await;
                PeerOutcome::from_result(peer, result)
            });
        }

        if !invariant_one_subscription_per_peer(request.target_peers.len(), subscriptions.len()) {
            warn!(
                targets = request.target_peers.len(),
                subscriptions = subscriptions.len(),
                "[channel-join] Subscription count differs from target count"
            );
        }

        let (submission, peers) = tokio::join!(
            submit_join(channel, request, genesis, join_tx),
            join_all(listeners)
        );

        if let Ok(response) = &submission {
            debug!(
                response = %serde_json::to_string(response).unwrap_or_default(),
                "[channel-join] Join channel response"
            );
        }

        (decide_outcome(&submission, &peers), peers)
    }

    async fn open_subscription(
        &self,
        peer: &PeerRef,
    ) -> Result<BlockSubscription, JoinError> {
        let connection = self
            .client
            .connect_peer(peer)
            .await
            .map_err(|source| JoinError::PeerConnection {
                peer: peer.address.clone(),
                source,
            })?;

        let subscription = connection
            .subscribe_block_events()
            .await
            .map_err(|source| JoinError::PeerConnection {
                peer: peer.address.clone(),
                source,
            })?;

        debug!(
            peer = %connection.address(),
            endpoint = %peer.event_endpoint(),
            "[channel-join] Registered block event listener"
        );
        Ok(subscription)
    }
}

#[async_trait]
impl<C: NetworkClient + 'static> ChannelJoinApi for JoinCoordinator<C> {
    async fn join_channel(
        &self,
        target_peers: &[PeerRef],
        channel_id: &str,
        identity: &str,
        organization: &str,
    ) -> JoinOutcome {
        let request = JoinRequest::new(channel_id, organization, identity, target_peers.to_vec());
        self.join(request).await
    }
}
