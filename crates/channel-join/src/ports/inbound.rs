//! # Inbound Ports
//!
//! API trait defining what the channel join service can do.

use crate::domain::{JoinOutcome, PeerRef};
use async_trait::async_trait;

/// Channel Join API - inbound port.
#[async_trait]
pub trait ChannelJoinApi: Send + Sync {
    /// Instruct `target_peers` of `organization` to join `channel_id`,
    /// acting as `identity`.
    ///
    /// Never fails; every error is reported through the returned outcome.
    async fn join_channel(
        &self,
        target_peers: &[PeerRef],
        channel_id: &str,
        identity: &str,
        organization: &str,
    ) -> JoinOutcome;
}
