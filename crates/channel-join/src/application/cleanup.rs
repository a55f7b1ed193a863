//! # Subscription Cleanup
//!
//! The set of block event subscriptions opened by one join invocation.
//!
//! The coordinator is its only owner. `release_all` visits every handle
//! exactly once; later calls return the first report. If the set is dropped
//! before `release_all` ran (the invocation was cancelled or unwound), `Drop`
//! releases whatever is still registered.

use tracing::{debug, warn};

use crate::domain::{CleanupReport, JoinError};
use crate::ports::EventSubscription;

/// Subscriptions opened during one invocation.
#[derive(Default)]
pub struct SubscriptionSet {
    handles: Vec<Box<dyn EventSubscription>>,
    report: CleanupReport,
    released: bool,
}

impl SubscriptionSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a subscription's release handle.
    pub fn push(&mut self, handle: Box<dyn EventSubscription>) {
        self.report.opened += 1;
        self.handles.push(handle);
    }

    /// Number of subscriptions opened.
    pub fn len(&self) -> usize {
        self.report.opened
    }

    /// True if nothing was opened.
    pub fn is_empty(&self) -> bool {
        self.report.opened == 0
    }

    /// Release every subscription still registered.
    ///
    /// Release failures are logged and counted, never returned.
    pub fn release_all(&mut self) -> CleanupReport {
        if self.released {
            return self.report;
        }
        self.released = true;

        for handle in self.handles.drain(..) {
            if !handle.is_active() {
                self.report.already_inactive += 1;
                continue;
            }
            match handle.release() {
                Ok(()) => {
                    self.report.released += 1;
                    debug!(peer = %handle.peer(), "[channel-join] Released block event subscription");
                }
                Err(e) => {
                    self.report.failed += 1;
                    let err = JoinError::Cleanup {
                        peer: handle.peer().to_string(),
                        reason: e.to_string(),
                    };
                    warn!(error = %err, "[channel-join] Cleanup failure ignored");
                }
            }
        }
        self.report
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        if !self.released && !self.handles.is_empty() {
            warn!(
                pending = self.handles.len(),
                "[channel-join] Releasing subscriptions of an abandoned join"
            );
            self.release_all();
        }
    }
}
