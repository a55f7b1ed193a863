//! # Join Submitter
//!
//! Sends the join proposal for every target peer and validates the envelope.

use tracing::{debug, error};

use crate::domain::{GenesisBlock, JoinRequest, NetworkError, SubmitError, SubmitResponse, TransactionId};
use crate::ports::ChannelHandle;

/// Submit `request` with `genesis` under `tx_id`.
///
/// Fails on transport errors, on a response that does not cover every
/// target, or on any peer returning a non-success status.
pub async fn submit_join(
    channel: &dyn ChannelHandle,
    request: &JoinRequest,
    genesis: &GenesisBlock,
    tx_id: TransactionId,
) -> Result<SubmitResponse, SubmitError> {
    debug!(
        channel = %request.channel_id,
        tx_id = %tx_id,
        targets = ?request.peer_addresses(),
        genesis_bytes = genesis.len(),
        "[channel-join] Submitting join proposal"
    );

    let response = channel
        .join_channel(&request.target_peers, tx_id, genesis)
        .await
        .map_err(|e| {
            error!(channel = %request.channel_id, error = %e, "[channel-join] Join submission failed");
            match e {
                NetworkError::Transport(msg) | NetworkError::Connection(msg) => SubmitError::Transport(msg),
                other => SubmitError::Transport(other.to_string()),
            }
        })?;

    validate_response(request, &response)?;
    Ok(response)
}

fn validate_response(request: &JoinRequest, response: &SubmitResponse) -> Result<(), SubmitError> {
    if response.responses.is_empty() {
        return Err(SubmitError::MalformedResponse("no peer responses".to_string()));
    }
    if response.responses.len() != request.target_peers.len() {
        return Err(SubmitError::MalformedResponse(format!(
            "expected {} peer responses, got {}",
            request.target_peers.len(),
            response.responses.len()
        )));
    }
    if let Some(rejection) = response.first_rejection() {
        return Err(SubmitError::Rejected {
            peer: rejection.peer.clone(),
            status: rejection.status,
            message: rejection.message.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PeerRef, PeerResponse};

    fn request(n: usize) -> JoinRequest {
        JoinRequest::new(
            "mychannel",
            "Org1",
            "admin",
            (0..n).map(|i| PeerRef::new(format!("peer{}:7051", i))).collect(),
        )
    }

    #[test]
    fn test_validate_ok() {
        let resp = SubmitResponse::new(vec![
            PeerResponse::accepted("peer0:7051"),
            PeerResponse::accepted("peer1:7051"),
        ]);
        assert!(validate_response(&request(2), &resp).is_ok());
    }

    #[test]
    fn test_validate_short_response() {
        let resp = SubmitResponse::new(vec![PeerResponse::accepted("peer0:7051")]);
        assert!(matches!(
            validate_response(&request(2), &resp),
            Err(SubmitError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_validate_rejection() {
        let resp = SubmitResponse::new(vec![PeerResponse::with_status("peer0:7051", 403, "denied")]);
        assert!(matches!(
            validate_response(&request(1), &resp),
            Err(SubmitError::Rejected { status: 403, .. })
        ));
    }
}
