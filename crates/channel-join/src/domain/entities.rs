//! # Domain Entities
//!
//! Request, response and outcome types of one join invocation.

use super::errors::{JoinError, ListenerError};
use super::invariants::STATUS_ACCEPTED;
use super::value_objects::PeerRef;
use serde::Serialize;

/// One join invocation's parameters. Immutable once built.
#[derive(Clone, Debug)]
pub struct JoinRequest {
    /// Channel to join.
    pub channel_id: String,
    /// Organization owning the peers.
    pub organization: String,
    /// Identity acting on behalf of the organization.
    pub acting_identity: String,
    /// Peers instructed to join, in order.
    pub target_peers: Vec<PeerRef>,
}

impl JoinRequest {
    /// Build a join request.
    pub fn new(
        channel_id: impl Into<String>,
        organization: impl Into<String>,
        acting_identity: impl Into<String>,
        target_peers: Vec<PeerRef>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            organization: organization.into(),
            acting_identity: acting_identity.into(),
            target_peers,
        }
    }

    /// Addresses of the target peers, in order.
    pub fn peer_addresses(&self) -> Vec<&str> {
        self.target_peers.iter().map(|p| p.address.as_str()).collect()
    }
}

/// A single peer's answer to the join submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeerResponse {
    /// Peer address.
    pub peer: String,
    /// Status code (200 on acceptance).
    pub status: u16,
    /// Free-form message returned by the peer.
    pub message: String,
}

impl PeerResponse {
    /// An accepted response.
    pub fn accepted(peer: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            status: STATUS_ACCEPTED,
            message: String::new(),
        }
    }

    /// A response with an arbitrary status.
    pub fn with_status(peer: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            status,
            message: message.into(),
        }
    }

    /// Did the peer accept the join?
    pub fn is_accepted(&self) -> bool {
        self.status == STATUS_ACCEPTED
    }
}

/// Per-peer responses to a join submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SubmitResponse {
    /// One entry per targeted peer.
    pub responses: Vec<PeerResponse>,
}

impl SubmitResponse {
    /// Wrap per-peer responses.
    pub fn new(responses: Vec<PeerResponse>) -> Self {
        Self { responses }
    }

    /// First non-accepted response, if any.
    pub fn first_rejection(&self) -> Option<&PeerResponse> {
        self.responses.iter().find(|r| !r.is_accepted())
    }

    /// True if non-empty and every peer accepted.
    pub fn all_accepted(&self) -> bool {
        !self.responses.is_empty() && self.first_rejection().is_none()
    }
}

/// Confirmation result for one targeted peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeerOutcome {
    /// Peer address.
    pub peer: String,
    /// Why the peer did not confirm, if it didn't.
    pub error: Option<ListenerError>,
}

impl PeerOutcome {
    /// Build from a listener result.
    pub fn from_result(peer: impl Into<String>, result: Result<(), ListenerError>) -> Self {
        Self {
            peer: peer.into(),
            error: result.err(),
        }
    }

    /// Did the peer confirm the join?
    pub fn confirmed(&self) -> bool {
        self.error.is_none()
    }
}

/// What happened while releasing subscriptions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Subscriptions opened during the invocation.
    pub opened: usize,
    /// Subscriptions released by cleanup.
    pub released: usize,
    /// Subscriptions already inactive when cleanup reached them.
    pub already_inactive: usize,
    /// Releases that failed (logged only).
    pub failed: usize,
}

impl CleanupReport {
    /// Every opened subscription was visited exactly once.
    pub fn is_complete(&self) -> bool {
        self.released + self.already_inactive + self.failed == self.opened
    }
}

/// The single value returned to the caller of a join.
#[derive(Clone, Debug, Serialize)]
pub struct JoinOutcome {
    /// Did every peer join?
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Primary failure, if any.
    pub error: Option<JoinError>,
    /// Per-peer confirmation results.
    pub peers: Vec<PeerOutcome>,
    /// Subscription release summary.
    pub cleanup: CleanupReport,
}

impl JoinOutcome {
    /// Successful join.
    pub fn succeeded(
        organization: &str,
        channel_id: &str,
        peers: Vec<PeerOutcome>,
        cleanup: CleanupReport,
    ) -> Self {
        Self {
            success: true,
            message: format!(
                "Successfully joined peers in organization {} to the channel '{}'",
                organization, channel_id
            ),
            error: None,
            peers,
            cleanup,
        }
    }

    /// Failed join.
    pub fn failed(error: JoinError, peers: Vec<PeerOutcome>, cleanup: CleanupReport) -> Self {
        Self {
            success: false,
            message: format!("Failed to join channel due to error: {}", error),
            error: Some(error),
            peers,
            cleanup,
        }
    }

    /// Peers that did not confirm.
    pub fn unconfirmed_peers(&self) -> Vec<&PeerOutcome> {
        self.peers.iter().filter(|p| !p.confirmed()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SubmitError;

    #[test]
    fn test_submit_response_all_accepted() {
        let resp = SubmitResponse::new(vec![
            PeerResponse::accepted("peer0"),
            PeerResponse::accepted("peer1"),
        ]);
        assert!(resp.all_accepted());
    }

    #[test]
    fn test_empty_submit_response_not_accepted() {
        assert!(!SubmitResponse::default().all_accepted());
    }

    #[test]
    fn test_first_rejection() {
        let resp = SubmitResponse::new(vec![
            PeerResponse::accepted("peer0"),
            PeerResponse::with_status("peer1", 500, "ledger exists"),
        ]);
        assert!(!resp.all_accepted());
        assert_eq!(resp.first_rejection().unwrap().peer, "peer1");
    }

    #[test]
    fn test_success_message_mentions_org_and_channel() {
        let outcome = JoinOutcome::succeeded("Org1", "mychannel", vec![], CleanupReport::default());
        assert!(outcome.success);
        assert!(outcome.message.contains("Org1"));
        assert!(outcome.message.contains("'mychannel'"));
    }

    #[test]
    fn test_failure_message_carries_error() {
        let outcome = JoinOutcome::failed(
            SubmitError::Transport("reset".to_string()).into(),
            vec![],
            CleanupReport::default(),
        );
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Failed to join channel"));
        assert!(outcome.message.contains("reset"));
    }

    #[test]
    fn test_cleanup_report_complete() {
        let report = CleanupReport {
            opened: 3,
            released: 2,
            already_inactive: 1,
            failed: 0,
        };
        assert!(report.is_complete());
    }
}
