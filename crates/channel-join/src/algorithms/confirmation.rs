//! # Confirmation Listener
//!
//! Waits for one peer to commit the config block of the channel it was asked
//! to join.
//!
//! The listener is a small state machine:
//!
//! ```text
//! Waiting ──(config block, same channel)──────► Resolved
//!    │
//!    ├──(config block, other channel)─────────► Rejected(ChannelMismatch)
//!    ├──(stream error / stream closed)────────► Rejected(StreamError)
//!    └──(deadline elapsed)────────────────────► Rejected(Timeout)
//! ```
//!
//! Blocks with a transaction count other than one are ignored; the peer may
//! be reporting activity on channels it already belongs to. Transitions out
//! of a terminal state are no-ops.
//!
//! The listener never releases its subscription. That is the coordinator's
//! job, after every listener has settled.

use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::domain::{ConfirmationEvent, ListenerError, CONFIG_BLOCK_TRANSACTION_COUNT};
use crate::ports::BlockEventStream;

/// Listener state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListenerState {
    /// No qualifying event seen yet.
    Waiting,
    /// The peer confirmed the join.
    Resolved,
    /// The peer did not confirm.
    Rejected(ListenerError),
}

impl ListenerState {
    /// Is the listener still waiting?
    pub fn is_waiting(&self) -> bool {
        matches!(self, ListenerState::Waiting)
    }

    /// Has the listener reached `Resolved` or `Rejected`?
    pub fn is_terminal(&self) -> bool {
        !self.is_waiting()
    }
}

/// Per-peer confirmation listener.
#[derive(Clone, Debug)]
pub struct ConfirmationListener {
    peer: String,
    channel_id: String,
    timeout: Duration,
    state: ListenerState,
}

impl ConfirmationListener {
    /// Create a listener for `peer` expecting a config block for `channel_id`.
    pub fn new(peer: impl Into<String>, channel_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            peer: peer.into(),
            channel_id: channel_id.into(),
            timeout,
            state: ListenerState::Waiting,
        }
    }

    /// Peer this listener watches.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Current state.
    pub fn state(&self) -> &ListenerState {
        &self.state
    }

    /// Feed one block event.
    pub fn on_event(&mut self, event: &ConfirmationEvent) -> &ListenerState {
        if self.state.is_terminal() {
            return &self.state;
        }

        if event.transaction_count != CONFIG_BLOCK_TRANSACTION_COUNT {
            trace!(
                peer = %self.peer,
                channel = %event.channel_id,
                block = event.block_number,
                txs = event.transaction_count,
                "[channel-join] Ignoring non-config block"
            );
            return &self.state;
        }

        if event.channel_id == self.channel_id {
            debug!(peer = %self.peer, channel = %self.channel_id, "[channel-join] Peer committed config block");
            self.state = ListenerState::Resolved;
        } else {
            warn!(
                peer = %self.peer,
                expected = %self.channel_id,
                actual = %event.channel_id,
                "[channel-join] Peer committed config block for another channel"
            );
            self.state = ListenerState::Rejected(ListenerError::ChannelMismatch {
                expected: self.channel_id.clone(),
                actual: event.channel_id.clone(),
            });
        }
        &self.state
    }

    /// Feed a stream error.
    pub fn on_stream_error(&mut self, cause: impl Into<String>) -> &ListenerState {
        if self.state.is_waiting() {
            let cause = cause.into();
            warn!(peer = %self.peer, %cause, "[channel-join] Block event stream failed");
            self.state = ListenerState::Rejected(ListenerError::StreamError(cause));
        }
        &self.state
    }

    /// The deadline elapsed.
    pub fn on_timeout(&mut self) -> &ListenerState {
        if self.state.is_waiting() {
            warn!(
                peer = %self.peer,
                timeout_ms = self.timeout_ms(),
                "[channel-join] Timed out waiting for block commit"
            );
            self.state = ListenerState::Rejected(ListenerError::Timeout {
                timeout_ms: self.timeout_ms(),
            });
        }
        &self.state
    }

    /// Drive the listener over `events` until it settles or the deadline elapses.
    ///
    /// Dropping the returned future abandons the listener without side effects.
    pub async fn await_confirmation(mut self, mut events: BlockEventStream) -> Result<(), ListenerError> {
        if tokio::time::timeout(self.timeout, self.drive(&mut events))
            .await
            .is_err()
        {
            self.on_timeout();
        }
        self.into_result()
    }

    async fn drive(&mut self, events: &mut BlockEventStream) {
        while self.state.is_waiting() {
            match events.next().await {
                Some(Ok(event)) => {
                    self.on_event(&event);
                }
                Some(Err(cause)) => {
                    self.on_stream_error(cause);
                }
                None => {
                    self.on_stream_error("event stream closed");
                }
            }
        }
    }

    /// Convert the settled state into a result.
    pub fn into_result(self) -> Result<(), ListenerError> {
        let timeout_ms = self.timeout_ms();
        match self.state {
            ListenerState::Resolved => Ok(()),
            ListenerState::Rejected(err) => Err(err),
            ListenerState::Waiting => Err(ListenerError::Timeout { timeout_ms }),
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}
