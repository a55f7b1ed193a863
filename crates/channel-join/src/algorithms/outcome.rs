//! # Outcome Decision
//!
//! Folds the submission result and every listener result into one verdict.

use crate::domain::{JoinError, PeerOutcome, SubmitError, SubmitResponse};

/// Decide whether the join succeeded.
///
/// A failed submission dominates: listener outcomes are irrelevant to the
/// verdict then, though they must still have been drained. Otherwise the
/// first peer that did not confirm, in target order, is reported.
pub fn decide_outcome(
    submission: &Result<SubmitResponse, SubmitError>,
    peers: &[PeerOutcome],
) -> Result<(), JoinError> {
    let response = submission.as_ref().map_err(|e| JoinError::Submit(e.clone()))?;

    if let Some(rejection) = response.first_rejection() {
        return Err(SubmitError::Rejected {
            peer: rejection.peer.clone(),
            status: rejection.status,
            message: rejection.message.clone(),
        }
        .into());
    }
    if response.responses.is_empty() {
        return Err(SubmitError::MalformedResponse("no peer responses".to_string()).into());
    }

    match peers.iter().find(|p| !p.confirmed()) {
        Some(PeerOutcome {
            peer,
            error: Some(error),
        }) => Err(JoinError::Listener {
            peer: peer.clone(),
            source: error.clone(),
        }),
        _ => Ok(()),
    }
}
